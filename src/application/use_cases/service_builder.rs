use std::path::PathBuf;

use tracing::{debug, info};

use crate::application::use_cases::schema_registry::scan_entity_names;
use crate::domain::dataset::IngestConfig;
use crate::domain::error::Result;
use crate::infrastructure::artifact_store::write_if_changed;

/// Regenerates the read-only service artifact from the model text
pub struct ServiceExposureBuilder {
    service_file: PathBuf,
    namespace: String,
    source_path: String,
    service_name: String,
    service_path: String,
    audit_columns: Vec<String>,
}

impl ServiceExposureBuilder {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            service_file: config.service_file.clone(),
            namespace: config.model_namespace.clone(),
            source_path: config.model_source_path.clone(),
            service_name: config.service_name.clone(),
            service_path: config.service_path.clone(),
            audit_columns: config.audit_columns.clone(),
        }
    }

    /// One projection line per distinct entity, in model order
    pub fn render(&self, model_text: &str) -> String {
        let excluded = self.audit_columns.join(", ");
        let mut out = format!(
            "using {{ {} as my }} from '{}';\n",
            self.namespace, self.source_path
        );
        out.push_str(&format!(
            "service {} @(path:'{}') {{\n",
            self.service_name, self.service_path
        ));
        for name in scan_entity_names(model_text) {
            if excluded.is_empty() {
                out.push_str(&format!(
                    "\t@readonly entity {name} as SELECT from my.{name} {{*}};\n"
                ));
            } else {
                out.push_str(&format!(
                    "\t@readonly entity {name} as SELECT from my.{name} {{*}} excluding {{ {excluded} }};\n"
                ));
            }
        }
        out.push_str("}\n");
        out
    }

    /// Rewrite the service artifact when its content would change.
    /// Returns whether the file was written.
    pub fn regenerate(&self, model_text: &str) -> Result<bool> {
        let service = self.render(model_text);
        let written = write_if_changed(&self.service_file, &service)?;
        if written {
            info!(path = %self.service_file.display(), "Service artifact regenerated");
        } else {
            debug!(path = %self.service_file.display(), "Service artifact unchanged");
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = "namespace data;\nusing { managed } from '@sap/cds/common';\n\nentity A : managed {\n\tkey ID : Integer;\n\tx  : String;\n}\n\nentity B : managed {\n\tkey ID : Integer;\n\ty  : Decimal;\n}\n";

    #[test]
    fn test_render_lists_entities_in_model_order() {
        let builder = ServiceExposureBuilder::from_config(&IngestConfig::default());
        assert_eq!(
            builder.render(MODEL),
            "using { data as my } from '../db/schema';\n\
             service CatalogService @(path:'/data') {\n\
             \t@readonly entity A as SELECT from my.A {*} excluding { createdAt, createdBy, modifiedAt, modifiedBy };\n\
             \t@readonly entity B as SELECT from my.B {*} excluding { createdAt, createdBy, modifiedAt, modifiedBy };\n\
             }\n"
        );
    }

    #[test]
    fn test_no_audit_columns_drops_excluding_clause() {
        let mut config = IngestConfig::default();
        config.audit_columns.clear();
        let builder = ServiceExposureBuilder::from_config(&config);
        assert!(builder
            .render(MODEL)
            .contains("\t@readonly entity A as SELECT from my.A {*};\n"));
    }

    #[test]
    fn test_regenerate_writes_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let config = IngestConfig::rooted_at(dir.path());
        let builder = ServiceExposureBuilder::from_config(&config);

        assert!(builder.regenerate(MODEL).unwrap());
        assert!(!builder.regenerate(MODEL).unwrap());
        let text = std::fs::read_to_string(&config.service_file).unwrap();
        assert_eq!(text.matches("@readonly").count(), 2);
    }
}
