pub mod csv_normalizer;
pub mod field_aggregator;
pub mod ingestion;
pub mod model_builder;
pub mod schema_registry;
pub mod service_builder;
pub mod source_reader;
pub mod type_inference;
