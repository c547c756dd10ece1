use tracing::{info, warn};

use crate::application::use_cases::field_aggregator::AggregatedField;
use crate::application::use_cases::schema_registry::{MergeOutcome, RegistrySession};
use crate::domain::dataset::{EntityDefinition, EntityField, ReconcilePolicy};
use crate::domain::error::Result;

/// Turns aggregated field types into entity definitions and merges them
/// into the model artifact
pub struct SchemaModelBuilder {
    policy: ReconcilePolicy,
}

impl SchemaModelBuilder {
    pub fn new(policy: ReconcilePolicy) -> Self {
        Self { policy }
    }

    /// A synthetic integer key is added unless some field is already named `id`.
    pub fn build_definition(entity_name: &str, fields: &[AggregatedField]) -> EntityDefinition {
        let has_id = fields.iter().any(|f| f.name.eq_ignore_ascii_case("id"));
        let fields = fields
            .iter()
            .map(|f| EntityField::new(f.name.clone(), f.field_type))
            .collect();
        EntityDefinition::new(entity_name, fields, !has_id)
    }

    /// Reconcile `definition` into the session's registry and persist it when
    /// the registry changed.
    pub fn merge(
        &self,
        session: &mut RegistrySession<'_>,
        definition: EntityDefinition,
    ) -> Result<MergeOutcome> {
        let outcome = session.registry.reconcile(definition, self.policy);
        match &outcome {
            MergeOutcome::Rejected { entity, new_fields } => {
                warn!(entity = %entity, new_fields = ?new_fields, "Schema change rejected");
            }
            MergeOutcome::Unchanged { entity } => {
                info!(entity = %entity, "Entity already registered");
            }
            other => {
                session.commit()?;
                info!(entity = %other.entity(), outcome = ?other, "Model updated");
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::schema_registry::ModelStore;
    use crate::domain::dataset::FieldType;

    fn field(name: &str, field_type: FieldType) -> AggregatedField {
        AggregatedField {
            name: name.to_string(),
            field_type,
            votes: 1,
        }
    }

    #[test]
    fn test_synthetic_key_added_without_id_field() {
        let def = SchemaModelBuilder::build_definition(
            "Cities",
            &[
                field("datasource_id", FieldType::Number),
                field("CityName", FieldType::String),
            ],
        );
        assert!(def.has_synthetic_key);
        assert_eq!(def.primary_key_count(), 1);
        assert_eq!(
            def.render_block(),
            "\nentity Cities : managed {\n\tkey ID : Integer;\n\tdatasource_id  : Decimal;\n\tCityName  : String;\n}\n"
        );
    }

    #[test]
    fn test_existing_id_field_suppresses_synthetic_key() {
        let def = SchemaModelBuilder::build_definition(
            "Items",
            &[field("Id", FieldType::Number), field("flag", FieldType::Boolean)],
        );
        assert!(!def.has_synthetic_key);
        assert_eq!(def.primary_key_count(), 1);
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path().join("schema.cds"), "namespace data;\n");
        let builder = SchemaModelBuilder::new(ReconcilePolicy::Extend);
        let fields = [field("x", FieldType::Date)];

        let mut session = store.open_session().await.unwrap();
        let first = builder
            .merge(&mut session, SchemaModelBuilder::build_definition("A", &fields))
            .unwrap();
        let text = store.read_text().unwrap();
        let second = builder
            .merge(&mut session, SchemaModelBuilder::build_definition("A", &fields))
            .unwrap();

        assert_eq!(first, MergeOutcome::Registered { entity: "A".into() });
        assert_eq!(second, MergeOutcome::Unchanged { entity: "A".into() });
        assert_eq!(store.read_text().unwrap(), text);
        assert_eq!(text.matches("entity A : managed").count(), 1);
    }
}
