// ============================================================
// FIELD TYPE ENUM
// ============================================================
// Inferred type tag for a single field value

use serde::{Deserialize, Serialize};

/// Type tag produced by inference for one (key, value) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Empty value, carries no information and never votes
    Skip,
    String,
    Number,
    Boolean,
    Date,
}

impl FieldType {
    /// Target type token written into the model artifact
    pub fn target_token(&self) -> &'static str {
        Self::token_for_tag(self.as_str())
    }

    /// Map a raw tag to a target token; anything unknown is a String
    pub fn token_for_tag(tag: &str) -> &'static str {
        match tag {
            "number" => "Decimal",
            "boolean" => "Boolean",
            "date" => "DateTime",
            _ => "String",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Skip => "skip",
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
        }
    }

    pub fn votes(&self) -> bool {
        !matches!(self, FieldType::Skip)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
