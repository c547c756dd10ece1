// ============================================================
// INGESTION USE CASE
// ============================================================
// One pass over the staging directory: read, infer, aggregate,
// merge into the model artifact, regenerate the service artifact

use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::application::use_cases::field_aggregator::{aggregate_records, AggregatedField};
use crate::application::use_cases::model_builder::SchemaModelBuilder;
use crate::application::use_cases::schema_registry::{
    scan_entity_names, MergeOutcome, ModelStore, RegistrySession,
};
use crate::application::use_cases::service_builder::ServiceExposureBuilder;
use crate::application::use_cases::source_reader::SourceReader;
use crate::application::use_cases::type_inference::TypeInferencer;
use crate::domain::dataset::{DataSource, IngestConfig, SourceFormat};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::storage::{finish_processed_file, list_staged_files};

/// What happened to one staged file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    Merged { merge: MergeOutcome },
    /// No records could be read; nothing was registered
    Empty,
    Skipped { reason: String },
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub file_name: String,
    pub entity: Option<String>,
    pub format: Option<SourceFormat>,
    pub records: usize,
    pub fields: Vec<AggregatedField>,
    /// Set when the content was only partially readable
    pub degraded: Option<String>,
    pub outcome: DatasetOutcome,
}

impl DatasetReport {
    fn new(file_name: String, outcome: DatasetOutcome) -> Self {
        Self {
            file_name,
            entity: None,
            format: None,
            records: 0,
            fields: Vec::new(),
            degraded: None,
            outcome,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DatasetOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub datasets: Vec<DatasetReport>,
    /// Registered entity names after the pass, in model order
    pub entities: Vec<String>,
    pub service_written: bool,
    pub duration_ms: u64,
}

impl IngestReport {
    pub fn failed_count(&self) -> usize {
        self.datasets.iter().filter(|d| d.is_failed()).count()
    }
}

/// Ingestion use case
pub struct IngestionUseCase {
    config: IngestConfig,
    reader: SourceReader,
    inferencer: TypeInferencer,
    model_builder: SchemaModelBuilder,
    service_builder: ServiceExposureBuilder,
    store: ModelStore,
}

impl IngestionUseCase {
    pub fn new(config: IngestConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| AppError::ConfigError(format!("Invalid ingestion config: {}", e)))?;

        Ok(Self {
            reader: SourceReader::new(&config)?,
            inferencer: TypeInferencer::default(),
            model_builder: SchemaModelBuilder::new(config.reconcile_policy),
            service_builder: ServiceExposureBuilder::from_config(&config),
            store: ModelStore::new(config.model_file.clone(), config.model_preamble.clone()),
            config,
        })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest every staged file in file-name order. Per-dataset failures are
    /// reported, not returned; listing the staging directory, taking the
    /// writer lock and writing artifacts are fatal.
    pub async fn run_pass(&self) -> Result<IngestReport> {
        let start = Instant::now();
        let files = list_staged_files(&self.config.staging_dir)?;
        info!(
            staging_dir = %self.config.staging_dir.display(),
            files = files.len(),
            "Ingestion pass started"
        );

        let mut session = self.store.open_session().await?;
        let mut datasets = Vec::with_capacity(files.len());
        for path in &files {
            datasets.push(self.process(&mut session, path)?);
        }

        let report = self.finish(datasets, start)?;
        drop(session);
        info!(
            datasets = report.datasets.len(),
            failed = report.failed_count(),
            entities = report.entities.len(),
            duration_ms = report.duration_ms,
            "Ingestion pass finished"
        );
        Ok(report)
    }

    /// Ingest a single staged file
    pub async fn ingest_dataset(&self, path: &Path) -> Result<DatasetReport> {
        if !path.is_file() {
            return Err(AppError::NotFound(format!(
                "Staged file not found: {}",
                path.display()
            )));
        }

        let start = Instant::now();
        let mut session = self.store.open_session().await?;
        let dataset = self.process(&mut session, path)?;
        let mut report = self.finish(vec![dataset], start)?;
        drop(session);
        Ok(report.datasets.remove(0))
    }

    /// Entity names currently present in the model artifact
    pub fn registered_entities(&self) -> Result<Vec<String>> {
        Ok(scan_entity_names(&self.store.read_text()?))
    }

    fn finish(&self, datasets: Vec<DatasetReport>, start: Instant) -> Result<IngestReport> {
        let model_text = self.store.read_text()?;
        let service_written = self.service_builder.regenerate(&model_text)?;
        Ok(IngestReport {
            datasets,
            entities: scan_entity_names(&model_text),
            service_written,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Run one file through the pipeline. Only artifact write failures escape.
    fn process(&self, session: &mut RegistrySession<'_>, path: &Path) -> Result<DatasetReport> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        let Some(mut source) = DataSource::from_path(path, &self.config.name_prefix) else {
            debug!(file = %file_name, "Unsupported staging file skipped");
            return Ok(DatasetReport::new(
                file_name,
                DatasetOutcome::Skipped {
                    reason: "unsupported file extension".to_string(),
                },
            ));
        };

        let mut report = DatasetReport::new(file_name, DatasetOutcome::Empty);
        report.entity = Some(source.name.clone());
        report.format = Some(source.format);

        let read = match self.reader.read(&mut source) {
            Ok(read) => read,
            Err(e) => {
                error!(dataset = %source.name, path = %path.display(), error = %e, "Dataset failed");
                report.outcome = DatasetOutcome::Failed {
                    reason: e.to_string(),
                };
                return Ok(report);
            }
        };
        report.records = read.records.len();
        report.degraded = read.degraded;

        if read.records.is_empty() {
            warn!(dataset = %source.name, "No records read, nothing registered");
            return Ok(report);
        }

        let fields = aggregate_records(&read.records, &self.inferencer);
        let definition = SchemaModelBuilder::build_definition(&source.name, &fields);
        let merge = self.model_builder.merge(session, definition)?;
        report.fields = fields;
        report.outcome = DatasetOutcome::Merged { merge };

        match finish_processed_file(
            &source.path,
            self.config.processed_action,
            &self.config.staging_dir,
            &self.config.archive_dir,
        ) {
            Ok(Some(archived)) => {
                debug!(dataset = %source.name, archived = %archived.display(), "Staged file archived")
            }
            Ok(None) => {}
            Err(e) => warn!(dataset = %source.name, error = %e, "Post-ingestion file handling failed"),
        }

        Ok(report)
    }
}
