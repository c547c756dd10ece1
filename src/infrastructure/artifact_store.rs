use crate::domain::error::{AppError, Result};
use crate::infrastructure::storage::ensure_dir;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::IoError(msg.into())
}

/// Read an artifact as text. A missing file reads as `None`.
pub fn read_artifact(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(format!(
            "Failed to read artifact {}: {e}",
            path.display()
        ))),
    }
}

/// Write `text` only when it differs from the stored content.
/// Returns whether a write happened.
pub fn write_if_changed(path: &Path, text: &str) -> Result<bool> {
    if read_artifact(path)?.as_deref() == Some(text) {
        return Ok(false);
    }
    atomic_write_bytes(path, text.as_bytes())?;
    Ok(true)
}

pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent)?;
        }
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            io_err(format!(
                "Failed to create temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.write_all(bytes).map_err(|e| {
            io_err(format!(
                "Failed to write temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.sync_all().ok();
    }

    // Rename replaces the destination atomically on unix.
    // On Windows, rename cannot replace; we move old away then swap.
    if cfg!(windows) && path.exists() {
        let backup = path.with_extension(format!("bak-{}", Uuid::new_v4()));
        fs::rename(path, &backup).map_err(|e| {
            io_err(format!(
                "Failed to move existing file {} to {}: {e}",
                path.display(),
                backup.display()
            ))
        })?;
        fs::rename(&tmp_path, path).map_err(|e| {
            io_err(format!(
                "Failed to rename temp file {} to {}: {e}",
                tmp_path.display(),
                path.display()
            ))
        })?;
        let _ = fs::remove_file(&backup);
        return Ok(());
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_err(format!(
            "Failed to rename temp file {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;
    Ok(())
}

/// Exclusive writer lock on the model artifact, held as `<model_file>.lock`.
/// The lock file is removed when the guard drops.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

impl StoreLock {
    pub fn acquire(artifact: &Path) -> Result<Self> {
        let path = lock_path(artifact);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_dir(parent)?;
            }
        }

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(AppError::LockError(format!(
                "Another ingestion holds {}; remove it if no ingestion is running",
                path.display()
            ))),
            Err(e) => Err(io_err(format!(
                "Failed to create lock file {}: {e}",
                path.display()
            ))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to release store lock");
        }
    }
}

fn lock_path(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    artifact.with_file_name(name)
}
