pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;

pub use application::{DatasetOutcome, DatasetReport, IngestReport, IngestionUseCase};
pub use domain::dataset::{IngestConfig, ProcessedAction, ReconcilePolicy};
pub use domain::error::{AppError, Result};
pub use infrastructure::config::ConfigService;
