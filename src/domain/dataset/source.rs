// ============================================================
// DATA SOURCE
// ============================================================
// A staged raw file and its declared format

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supported staging file formats, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Xlsx,
    Json,
    Xml,
}

impl SourceFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" => Some(SourceFormat::Xlsx),
            "json" => Some(SourceFormat::Json),
            "xml" => Some(SourceFormat::Xml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Csv => write!(f, "csv"),
            SourceFormat::Xlsx => write!(f, "xlsx"),
            SourceFormat::Json => write!(f, "json"),
            SourceFormat::Xml => write!(f, "xml"),
        }
    }
}

/// A named raw file in the staging directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// Entity name derived from the file name
    pub name: String,

    /// Current location; XLSX sources are repointed to their CSV copy
    pub path: PathBuf,

    pub format: SourceFormat,
}

impl DataSource {
    /// Build a data source from a staged path, deriving the entity name.
    /// Returns `None` for unsupported extensions.
    pub fn from_path(path: &Path, name_prefix: &str) -> Option<Self> {
        let format = SourceFormat::from_path(path)?;
        let stem = path.file_stem()?.to_str()?;
        Some(Self {
            name: derive_entity_name(stem, name_prefix),
            path: path.to_path_buf(),
            format,
        })
    }
}

/// Strip the staging prefix and reduce a file stem to an entity identifier.
pub fn derive_entity_name(stem: &str, name_prefix: &str) -> String {
    let stem = if !name_prefix.is_empty() {
        stem.strip_prefix(name_prefix).unwrap_or(stem)
    } else {
        stem
    };

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if cleaned.is_empty() {
        return "Dataset".to_string();
    }
    if cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("n{}", cleaned);
    }
    cleaned
}
