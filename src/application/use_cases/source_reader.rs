// ============================================================
// SOURCE READER USE CASE
// ============================================================
// Turn one staged file into flat records, dispatching on format.
// Malformed content degrades to an empty or single-record result;
// only I/O failures on the file itself are errors.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::application::use_cases::csv_normalizer::CsvNormalizer;
use crate::domain::dataset::{DataSource, IngestConfig, Record, SourceFormat};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::CsvParser;
use crate::infrastructure::xlsx::convert_xlsx_to_csv;
use crate::infrastructure::xml::xml_to_json;

/// Records read from one source
#[derive(Debug, Clone, Default)]
pub struct SourceRecords {
    pub records: Vec<Record>,

    /// Why the content could not be read as intended, if it could not
    pub degraded: Option<String>,
}

impl SourceRecords {
    fn complete(records: Vec<Record>) -> Self {
        Self {
            records,
            degraded: None,
        }
    }

    fn degraded(source: &DataSource, records: Vec<Record>, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(
            dataset = %source.name,
            path = %source.path.display(),
            records = records.len(),
            reason = %reason,
            "Source content degraded"
        );
        Self {
            records,
            degraded: Some(reason),
        }
    }
}

pub struct SourceReader {
    normalizer: CsvNormalizer,
}

impl SourceReader {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        Ok(Self {
            normalizer: CsvNormalizer::new(config)?,
        })
    }

    /// Read a source. An XLSX source is converted to CSV first and repointed
    /// at the CSV file.
    pub fn read(&self, source: &mut DataSource) -> Result<SourceRecords> {
        match source.format {
            SourceFormat::Xlsx => match convert_xlsx_to_csv(&source.path) {
                Ok(csv_path) => {
                    source.path = csv_path;
                    source.format = SourceFormat::Csv;
                    self.read_csv(source)
                }
                Err(e) => Ok(SourceRecords::degraded(
                    source,
                    Vec::new(),
                    format!("XLSX conversion failed: {}", e),
                )),
            },
            SourceFormat::Csv => self.read_csv(source),
            SourceFormat::Json => self.read_json(source),
            SourceFormat::Xml => self.read_xml(source),
        }
    }

    fn read_csv(&self, source: &DataSource) -> Result<SourceRecords> {
        let normalized = self.normalizer.normalize_file(&source.path)?;
        if normalized.headers.is_empty() {
            return Ok(SourceRecords::degraded(source, Vec::new(), "CSV file is empty"));
        }

        let parser = CsvParser::new().with_delimiter(normalized.delimiter);
        match parser.parse_content(&normalized.content) {
            Ok((_, records)) => {
                debug!(dataset = %source.name, records = records.len(), "CSV records read");
                Ok(SourceRecords::complete(records))
            }
            Err(e) => Ok(SourceRecords::degraded(source, Vec::new(), e.to_string())),
        }
    }

    fn read_json(&self, source: &DataSource) -> Result<SourceRecords> {
        let text = read_text(&source.path)?;
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                return Ok(SourceRecords::degraded(
                    source,
                    Vec::new(),
                    format!("Invalid JSON: {}", e),
                ))
            }
        };

        match value {
            Value::Array(items) => {
                let total = items.len();
                let records: Vec<Record> = items.into_iter().filter_map(Record::from_value).collect();
                let skipped = total - records.len();
                if skipped > 0 {
                    return Ok(SourceRecords::degraded(
                        source,
                        records,
                        format!("{} array items are not objects", skipped),
                    ));
                }
                Ok(SourceRecords::complete(records))
            }
            Value::Object(_) => {
                let records = Record::from_value(value).into_iter().collect();
                Ok(SourceRecords::degraded(
                    source,
                    records,
                    "JSON document is an object, read as a single record",
                ))
            }
            _ => Ok(SourceRecords::degraded(
                source,
                Vec::new(),
                "JSON document is not an array of objects",
            )),
        }
    }

    fn read_xml(&self, source: &DataSource) -> Result<SourceRecords> {
        let text = read_text(&source.path)?;
        let document = match xml_to_json(&text) {
            Ok(document) => document,
            Err(e) => return Ok(SourceRecords::degraded(source, Vec::new(), e.to_string())),
        };

        match locate_records(document) {
            Located::Collection(records) => Ok(SourceRecords::complete(records)),
            Located::Root(record) => Ok(SourceRecords::degraded(
                source,
                vec![record],
                "No item collection found, read the root element as a single record",
            )),
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| AppError::IoError(format!("Failed to read {}: {}", path.display(), e)))
}

#[derive(Debug, PartialEq)]
pub enum Located {
    /// Items of the first array of objects found
    Collection(Vec<Record>),
    /// Fallback: the root element as one record
    Root(Record),
}

/// Find the item array of a `root -> collection -> item[]` document.
/// Arrays directly under the root are checked before arrays one level deeper.
pub fn locate_records(document: Value) -> Located {
    let (root_name, root) = match document {
        Value::Object(map) if map.len() == 1 => match map.into_iter().next() {
            Some(entry) => entry,
            None => return Located::Root(Record::new()),
        },
        Value::Object(map) => return Located::Root(Record { fields: map }),
        other => {
            let mut record = Record::new();
            record.insert("value", other);
            return Located::Root(record);
        }
    };

    let Value::Object(children) = root else {
        let mut record = Record::new();
        record.insert(root_name, root);
        return Located::Root(record);
    };

    let found = children
        .values()
        .find_map(object_items)
        .or_else(|| {
            children
                .values()
                .filter_map(|child| child.as_object())
                .flat_map(|grandchildren| grandchildren.values())
                .find_map(object_items)
        });

    match found {
        Some(records) => Located::Collection(records),
        None => Located::Root(Record { fields: children }),
    }
}

fn object_items(value: &Value) -> Option<Vec<Record>> {
    let items = value.as_array()?;
    if items.is_empty() || !items.iter().all(Value::is_object) {
        return None;
    }
    Some(
        items
            .iter()
            .cloned()
            .filter_map(Record::from_value)
            .collect(),
    )
}
