pub mod error;

// Dataset ingestion and schema model types
pub mod dataset;
