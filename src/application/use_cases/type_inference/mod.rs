// ============================================================
// TYPE INFERENCE
// ============================================================
// Classify single (key, value) pairs into field types using an
// ordered, inspectable rule table

mod rules;

use serde::Serialize;
use serde_json::Value;

use crate::domain::dataset::{FieldType, Record};

pub use rules::{
    default_rules, parses_as_date, primitive_type, InferenceRule, DATE_ONLY_FORMATS,
    DATE_TIME_FORMATS,
};

/// Inferred type of one field in one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldObservation {
    pub field: String,
    pub field_type: FieldType,
}

pub struct TypeInferencer {
    rules: Vec<InferenceRule>,
}

impl Default for TypeInferencer {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl TypeInferencer {
    pub fn new(rules: Vec<InferenceRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[InferenceRule] {
        &self.rules
    }

    /// First matching rule wins; a value no rule claims keeps its runtime type.
    pub fn infer(&self, key: &str, value: &Value) -> FieldType {
        self.matching_rule(key, value)
            .map(|rule| rule.field_type)
            .unwrap_or_else(|| primitive_type(value))
    }

    /// The rule that decides `infer(key, value)`, if any
    pub fn matching_rule(&self, key: &str, value: &Value) -> Option<&InferenceRule> {
        let key = key.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&key, value))
    }

    pub fn observe(&self, record: &Record) -> Vec<FieldObservation> {
        record
            .iter()
            .map(|(field, value)| FieldObservation {
                field: field.clone(),
                field_type: self.infer(field, value),
            })
            .collect()
    }
}
