use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::dataset::ProcessedAction;
use crate::domain::error::{AppError, Result};

/// List regular, non-hidden files in the staging directory, ordered by file name.
/// Failing to read the directory itself is the one fatal error of a pass.
pub fn list_staged_files(staging_dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(staging_dir).map_err(|e| {
        AppError::IoError(format!(
            "Failed to list staging dir {}: {}",
            staging_dir.display(),
            e
        ))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(true);
        if hidden || !path.is_file() {
            continue;
        }
        files.push(path);
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Apply the configured post-ingestion action to a staged file
pub fn finish_processed_file(
    path: &Path,
    action: ProcessedAction,
    staging_dir: &Path,
    archive_dir: &str,
) -> Result<Option<PathBuf>> {
    match action {
        ProcessedAction::Keep => Ok(None),
        ProcessedAction::Delete => {
            fs::remove_file(path)?;
            Ok(None)
        }
        ProcessedAction::Archive => {
            let target_dir = staging_dir.join(archive_dir);
            ensure_dir(&target_dir)?;
            let file_name = path
                .file_name()
                .ok_or_else(|| AppError::ValidationError("Invalid file name".to_string()))?;
            let target = target_dir.join(file_name);
            fs::rename(path, &target)?;
            Ok(Some(target))
        }
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        AppError::IoError(format!("Failed to create dir {}: {}", path.display(), e))
    })
}
