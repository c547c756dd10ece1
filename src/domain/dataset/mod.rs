// ============================================================
// DATASET DOMAIN LAYER
// ============================================================
// Core types for schema inference and model generation
// No I/O, no async

mod entity;
mod field_type;
mod ingest_config;
mod record;
mod source;

pub use entity::{EntityDefinition, EntityField, SYNTHETIC_KEY_NAME, SYNTHETIC_KEY_TOKEN};
pub use field_type::FieldType;
pub use ingest_config::{IngestConfig, ProcessedAction, ReconcilePolicy};
pub use record::Record;
pub use source::{derive_entity_name, DataSource, SourceFormat};
