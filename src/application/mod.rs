pub mod use_cases;

pub use use_cases::ingestion::{DatasetOutcome, DatasetReport, IngestReport, IngestionUseCase};
