// ============================================================
// INGESTION CONFIGURATION
// ============================================================
// Paths, naming conventions and policies for one ingestion pass

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when a dataset's entity name is already registered
/// with a different field set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePolicy {
    /// Append new fields, keep existing fields and their types
    #[default]
    Extend,
    /// Register the new shape under `<Name>_v<N>`
    Version,
    /// Keep the existing definition untouched
    Reject,
}

/// What happens to a staged file after it was ingested successfully
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessedAction {
    /// Leave it for an external cleanup step
    #[default]
    Keep,
    Delete,
    /// Move it into `archive_dir` under the staging directory
    Archive,
}

/// Configuration for dataset ingestion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory listed for staged data sources
    pub staging_dir: PathBuf,

    /// Model artifact (entity blocks)
    pub model_file: PathBuf,

    /// Service-exposure artifact
    pub service_file: PathBuf,

    /// Stripped from file stems to derive entity names (default: "data-")
    pub name_prefix: String,

    /// Regex character-class body of characters allowed in CSV headers
    pub header_alphabet: String,

    /// Headers longer than this are truncated (default: 124)
    pub max_header_len: usize,

    /// Only files whose name contains this marker are checked for a tag row.
    /// `None` checks every CSV.
    pub tag_row_marker: Option<String>,

    /// Written at the top of a freshly created model artifact
    pub model_preamble: String,

    /// Namespace the service artifact imports as `my`
    pub model_namespace: String,

    /// Path of the model artifact as seen from the service artifact
    pub model_source_path: String,

    pub service_name: String,
    pub service_path: String,

    /// Columns of managed entities excluded from the read-only projection
    pub audit_columns: Vec<String>,

    pub reconcile_policy: ReconcilePolicy,
    pub processed_action: ProcessedAction,

    /// Archive subdirectory of the staging directory
    pub archive_dir: String,

    /// Bind address for the HTTP surface
    pub http_bind: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            staging_dir: PathBuf::from("staging/db/data"),
            model_file: PathBuf::from("staging/db/schema.cds"),
            service_file: PathBuf::from("staging/srv/data-service.cds"),
            name_prefix: "data-".to_string(),
            header_alphabet: "A-Za-z0-9".to_string(),
            max_header_len: 124,
            tag_row_marker: Some("hxl".to_string()),
            model_preamble: "namespace data;\nusing { managed } from '@sap/cds/common';\n"
                .to_string(),
            model_namespace: "data".to_string(),
            model_source_path: "../db/schema".to_string(),
            service_name: "CatalogService".to_string(),
            service_path: "/data".to_string(),
            audit_columns: vec![
                "createdAt".to_string(),
                "createdBy".to_string(),
                "modifiedAt".to_string(),
                "modifiedBy".to_string(),
            ],
            reconcile_policy: ReconcilePolicy::Extend,
            processed_action: ProcessedAction::Keep,
            archive_dir: "processed".to_string(),
            http_bind: "127.0.0.1:4005".to_string(),
        }
    }
}

impl IngestConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config rooted at a given working directory (used by tests and the CLI)
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let defaults = Self::default();
        Self {
            staging_dir: root.join(&defaults.staging_dir),
            model_file: root.join(&defaults.model_file),
            service_file: root.join(&defaults.service_file),
            ..defaults
        }
    }

    /// Compiled "anything outside the header alphabet" pattern
    pub fn header_reject_pattern(&self) -> Result<Regex, String> {
        Regex::new(&format!("[^{}]", self.header_alphabet))
            .map_err(|e| format!("header_alphabet is not a valid character class: {}", e))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.staging_dir.as_os_str().is_empty() {
            return Err("staging_dir must not be empty".to_string());
        }
        if self.model_file.as_os_str().is_empty() || self.service_file.as_os_str().is_empty() {
            return Err("model_file and service_file must not be empty".to_string());
        }
        if self.model_file == self.service_file {
            return Err("model_file and service_file must differ".to_string());
        }
        if self.max_header_len == 0 {
            return Err("max_header_len must be > 0".to_string());
        }
        if self.header_alphabet.trim().is_empty() {
            return Err("header_alphabet must not be empty".to_string());
        }
        self.header_reject_pattern()?;
        if self.service_name.trim().is_empty() {
            return Err("service_name must not be empty".to_string());
        }
        if self.processed_action == ProcessedAction::Archive && self.archive_dir.trim().is_empty()
        {
            return Err("archive_dir must be set when processed_action is archive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(IngestConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_shared_artifact_path() {
        let mut config = IngestConfig::default();
        config.service_file = config.model_file.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_header_alphabet() {
        let mut config = IngestConfig::default();
        config.header_alphabet = "z-a".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rooted_at_joins_paths() {
        let config = IngestConfig::rooted_at("/srv/app");
        assert_eq!(config.model_file, PathBuf::from("/srv/app/staging/db/schema.cds"));
        assert_eq!(config.name_prefix, "data-");
    }
}
