use std::path::Path;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;

use crate::domain::dataset::IngestConfig;
use crate::domain::error::{AppError, Result};

/// Environment variables with this prefix override file and default values,
/// e.g. `DATAMODELER_STAGING_DIR=/data/in`.
pub const ENV_PREFIX: &str = "DATAMODELER_";

pub struct ConfigService;

impl ConfigService {
    /// Layer defaults, an optional TOML file and `DATAMODELER_*` variables.
    /// A `.env` file in the working directory is loaded first when present.
    pub fn load(config_file: Option<&Path>) -> Result<IngestConfig> {
        let _ = dotenvy::dotenv();
        Self::load_from(Self::figment(config_file)?)
    }

    fn figment(config_file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(IngestConfig::default()));
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(AppError::ConfigError(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    fn load_from(figment: Figment) -> Result<IngestConfig> {
        let config: IngestConfig = figment.extract()?;
        config.validate().map_err(AppError::ConfigError)?;
        tracing::debug!(
            staging_dir = %config.staging_dir.display(),
            model_file = %config.model_file.display(),
            policy = ?config.reconcile_policy,
            "Ingestion config loaded"
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dataset::{ProcessedAction, ReconcilePolicy};

    #[test]
    fn test_defaults_without_file() {
        let config = ConfigService::load_from(Figment::from(Serialized::defaults(
            IngestConfig::default(),
        )))
        .unwrap();
        assert_eq!(config.max_header_len, 124);
        assert_eq!(config.reconcile_policy, ReconcilePolicy::Extend);
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datamodeler.toml");
        std::fs::write(
            &path,
            "staging_dir = \"in\"\nreconcile_policy = \"version\"\nprocessed_action = \"archive\"\n",
        )
        .unwrap();

        let config = ConfigService::load_from(
            Figment::from(Serialized::defaults(IngestConfig::default())).merge(Toml::file(&path)),
        )
        .unwrap();
        assert_eq!(config.staging_dir, std::path::PathBuf::from("in"));
        assert_eq!(config.reconcile_policy, ReconcilePolicy::Version);
        assert_eq!(config.processed_action, ProcessedAction::Archive);
        assert_eq!(config.service_name, "CatalogService");
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "max_header_len = 0\n").unwrap();

        let err = ConfigService::load_from(
            Figment::from(Serialized::defaults(IngestConfig::default())).merge(Toml::file(&path)),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let err = ConfigService::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
