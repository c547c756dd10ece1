// ============================================================
// RECORD TYPES
// ============================================================
// Flat records produced by the source readers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single flat record: ordered field name -> raw scalar value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Insertion-ordered (serde_json built with `preserve_order`)
    pub fields: Map<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from string cells, pairing them with headers by position.
    /// Missing cells become empty strings.
    pub fn from_cells<'a>(headers: &[String], cells: impl IntoIterator<Item = &'a str>) -> Self {
        let mut cells = cells.into_iter();
        let mut fields = Map::new();
        for header in headers {
            let value = cells.next().unwrap_or("");
            fields.insert(header.clone(), Value::String(value.to_string()));
        }
        Self { fields }
    }

    /// Wrap a JSON object; anything else is not a record
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
