// ============================================================
// ENTITY DEFINITION
// ============================================================
// Inferred shape of one dataset and its model-artifact text block

use serde::{Deserialize, Serialize};

use super::FieldType;

/// Name of the synthetic integer primary key
pub const SYNTHETIC_KEY_NAME: &str = "ID";

/// Type token of the synthetic primary key
pub const SYNTHETIC_KEY_TOKEN: &str = "Integer";

/// One field line of an entity block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityField {
    pub name: String,

    /// Target type token, e.g. `Decimal`
    pub token: String,

    /// Rendered with a `key` prefix
    #[serde(default)]
    pub is_key: bool,
}

impl EntityField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            token: field_type.target_token().to_string(),
            is_key: false,
        }
    }

    pub fn with_token(name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            is_key: false,
        }
    }

    /// Tab-indented field line, newline terminated
    pub fn render_line(&self) -> String {
        if self.is_key {
            format!("\tkey {} : {};\n", self.name, self.token)
        } else {
            format!("\t{}  : {};\n", self.name, self.token)
        }
    }
}

/// Inferred schema of one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    pub fields: Vec<EntityField>,
    pub has_synthetic_key: bool,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<EntityField>, has_synthetic_key: bool) -> Self {
        Self {
            name: name.into(),
            fields,
            has_synthetic_key,
        }
    }

    pub fn field(&self, name: &str) -> Option<&EntityField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Count of fields that could act as a primary key
    pub fn primary_key_count(&self) -> usize {
        let explicit = self
            .fields
            .iter()
            .filter(|f| f.is_key || f.name.eq_ignore_ascii_case("id"))
            .count();
        explicit + usize::from(self.has_synthetic_key)
    }

    /// Serialize as a model-artifact block:
    ///
    /// ```text
    ///
    /// entity Name : managed {
    ///     key ID : Integer;
    ///     field  : Decimal;
    /// }
    /// ```
    ///
    /// (field lines are tab-indented)
    pub fn render_block(&self) -> String {
        let mut out = format!("\nentity {} : managed {{\n", self.name);
        if self.has_synthetic_key {
            out.push_str(&format!(
                "\tkey {} : {};\n",
                SYNTHETIC_KEY_NAME, SYNTHETIC_KEY_TOKEN
            ));
        }
        for field in &self.fields {
            out.push_str(&field.render_line());
        }
        out.push_str("}\n");
        out
    }
}
