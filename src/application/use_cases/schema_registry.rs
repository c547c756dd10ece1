// ============================================================
// SCHEMA REGISTRY
// ============================================================
// Ordered in-memory view of the model artifact, with field-level
// reconciliation and a single-writer session for persisting it

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::domain::dataset::{
    EntityDefinition, EntityField, ReconcilePolicy, SYNTHETIC_KEY_NAME, SYNTHETIC_KEY_TOKEN,
};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::artifact_store::{read_artifact, write_if_changed, StoreLock};

static ENTITY_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^entity\s+([A-Za-z_][A-Za-z0-9_]*)(?:\s*:\s*managed)?\s*\{\s*$").unwrap()
});

static FIELD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(key\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*:\s*([^;{}]*?)\s*;\s*$").unwrap()
});

/// Entity names in order of first appearance in model text
pub fn scan_entity_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = ENTITY_HEADER.captures(line.trim_end()) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// What reconciling a definition did to the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// First registration of this entity name
    Registered { entity: String },
    /// Definition already covered by the registry
    Unchanged { entity: String },
    /// New fields appended to an existing entity
    Extended { entity: String, added: Vec<String> },
    /// Registered as a new version next to `base`
    Versioned { entity: String, base: String },
    /// Existing definition kept, these fields were not registered
    Rejected { entity: String, new_fields: Vec<String> },
}

impl MergeOutcome {
    pub fn entity(&self) -> &str {
        match self {
            MergeOutcome::Registered { entity }
            | MergeOutcome::Unchanged { entity }
            | MergeOutcome::Extended { entity, .. }
            | MergeOutcome::Versioned { entity, .. }
            | MergeOutcome::Rejected { entity, .. } => entity,
        }
    }

    pub fn changed_registry(&self) -> bool {
        matches!(
            self,
            MergeOutcome::Registered { .. }
                | MergeOutcome::Extended { .. }
                | MergeOutcome::Versioned { .. }
        )
    }
}

/// In-memory view of the model artifact.
///
/// The artifact text is the source of truth and is only ever appended to:
/// new entities go after the last block, new fields before the closing brace
/// of the entity's first block. Lines the parser does not understand are kept
/// as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaRegistry {
    text: String,
    entities: Vec<EntityDefinition>,
}

impl SchemaRegistry {
    pub fn new(preamble: impl Into<String>) -> Self {
        Self {
            text: preamble.into(),
            entities: Vec::new(),
        }
    }

    /// Parse model text. Repeated blocks for one name are folded together.
    pub fn parse(text: &str) -> Result<Self> {
        let mut registry = Self {
            text: text.to_string(),
            entities: Vec::new(),
        };
        let mut current: Option<EntityDefinition> = None;

        for (line_no, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim_end();

            if let Some(entity) = current.as_mut() {
                if line.trim() == "}" {
                    if let Some(done) = current.take() {
                        registry.absorb(done);
                    }
                } else if let Some(caps) = FIELD_LINE.captures(line) {
                    let is_key = caps.get(1).is_some();
                    let name = &caps[2];
                    let token = &caps[3];
                    if is_key
                        && entity.fields.is_empty()
                        && !entity.has_synthetic_key
                        && name == SYNTHETIC_KEY_NAME
                        && token == SYNTHETIC_KEY_TOKEN
                    {
                        entity.has_synthetic_key = true;
                    } else {
                        let mut field = EntityField::with_token(name, token);
                        field.is_key = is_key;
                        entity.fields.push(field);
                    }
                } else if !line.trim().is_empty() {
                    debug!(line = line_no + 1, text = %line, "Keeping unrecognized model line");
                }
                continue;
            }

            if let Some(caps) = ENTITY_HEADER.captures(line) {
                current = Some(EntityDefinition::new(&caps[1], Vec::new(), false));
            }
        }

        if let Some(open) = current {
            return Err(AppError::ParseError(format!(
                "Entity block '{}' is not closed",
                open.name
            )));
        }
        Ok(registry)
    }

    /// Model text including every change reconciled so far
    pub fn render(&self) -> String {
        self.text.clone()
    }

    pub fn get(&self, name: &str) -> Option<&EntityDefinition> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entities(&self) -> &[EntityDefinition] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Merge a freshly inferred definition according to `policy`.
    /// A definition whose fields are all registered already is a no-op.
    pub fn reconcile(
        &mut self,
        definition: EntityDefinition,
        policy: ReconcilePolicy,
    ) -> MergeOutcome {
        let Some(idx) = self.position(&definition.name) else {
            let entity = definition.name.clone();
            self.append_block(definition);
            return MergeOutcome::Registered { entity };
        };

        let new_fields = missing_fields(&self.entities[idx], &definition);
        if new_fields.is_empty() {
            return MergeOutcome::Unchanged {
                entity: definition.name,
            };
        }

        match policy {
            ReconcilePolicy::Extend => {
                let existing = &self.entities[idx];
                let entity = existing.name.clone();
                let mut additions = Vec::new();
                for field in definition.fields {
                    if !new_fields.contains(&field.name) {
                        continue;
                    }
                    if existing.has_synthetic_key && field.name.eq_ignore_ascii_case("id") {
                        warn!(
                            entity = %entity,
                            field = %field.name,
                            "Field would shadow the synthetic key, not added"
                        );
                        continue;
                    }
                    additions.push(field);
                }
                if additions.is_empty() {
                    return MergeOutcome::Unchanged { entity };
                }

                let Some(close) = block_close_offset(&self.text, &entity) else {
                    warn!(entity = %entity, "Entity block not found in model text, fields not added");
                    return MergeOutcome::Unchanged { entity };
                };
                let lines: String = additions.iter().map(EntityField::render_line).collect();
                self.text.insert_str(close, &lines);

                let added = additions.iter().map(|f| f.name.clone()).collect();
                self.entities[idx].fields.extend(additions);
                MergeOutcome::Extended { entity, added }
            }
            ReconcilePolicy::Version => self.register_version(definition),
            ReconcilePolicy::Reject => MergeOutcome::Rejected {
                entity: definition.name,
                new_fields,
            },
        }
    }

    fn register_version(&mut self, mut definition: EntityDefinition) -> MergeOutcome {
        let base = definition.name.clone();
        let mut version = 2u32;
        loop {
            let candidate = format!("{}_v{}", base, version);
            match self.position(&candidate) {
                Some(idx) if missing_fields(&self.entities[idx], &definition).is_empty() => {
                    return MergeOutcome::Unchanged { entity: candidate };
                }
                Some(_) => version += 1,
                None => {
                    definition.name = candidate.clone();
                    self.append_block(definition);
                    return MergeOutcome::Versioned {
                        entity: candidate,
                        base,
                    };
                }
            }
        }
    }

    fn append_block(&mut self, definition: EntityDefinition) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(&definition.render_block());
        self.entities.push(definition);
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entities.iter().position(|e| e.name == name)
    }

    /// Add a parsed block, folding repeated registrations of one name
    fn absorb(&mut self, block: EntityDefinition) {
        match self.position(&block.name) {
            Some(idx) => {
                let existing = &mut self.entities[idx];
                warn!(entity = %block.name, "Entity registered more than once, folding blocks");
                for field in block.fields {
                    if existing.field(&field.name).is_none() {
                        existing.fields.push(field);
                    }
                }
            }
            None => self.entities.push(block),
        }
    }
}

/// Byte offset of the closing-brace line of the first block named `name`
fn block_close_offset(text: &str, name: &str) -> Option<usize> {
    let mut offset = 0usize;
    let mut inside = false;
    for raw_line in text.split_inclusive('\n') {
        let line = raw_line.trim_end();
        if inside {
            if line.trim() == "}" {
                return Some(offset);
            }
        } else if ENTITY_HEADER
            .captures(line)
            .is_some_and(|caps| &caps[1] == name)
        {
            inside = true;
        }
        offset += raw_line.len();
    }
    None
}

fn missing_fields(existing: &EntityDefinition, candidate: &EntityDefinition) -> Vec<String> {
    candidate
        .fields
        .iter()
        .filter(|f| existing.field(&f.name).is_none())
        .map(|f| f.name.clone())
        .collect()
}

/// Owner of the model artifact. Writers go through [`ModelStore::open_session`],
/// which serializes them in-process and across processes.
pub struct ModelStore {
    model_file: PathBuf,
    preamble: String,
    writer: Mutex<()>,
}

impl ModelStore {
    pub fn new(model_file: impl Into<PathBuf>, preamble: impl Into<String>) -> Self {
        Self {
            model_file: model_file.into(),
            preamble: preamble.into(),
            writer: Mutex::new(()),
        }
    }

    pub fn model_file(&self) -> &Path {
        &self.model_file
    }

    /// Current registry; a missing artifact is an empty registry
    pub fn load(&self) -> Result<SchemaRegistry> {
        match read_artifact(&self.model_file)? {
            Some(text) => SchemaRegistry::parse(&text),
            None => Ok(SchemaRegistry::new(self.preamble.clone())),
        }
    }

    /// Raw artifact text, empty when it does not exist yet
    pub fn read_text(&self) -> Result<String> {
        Ok(read_artifact(&self.model_file)?.unwrap_or_default())
    }

    /// Take the writer lock and load the registry for modification.
    /// Fails with `LockError` while another process holds the lock file.
    pub async fn open_session(&self) -> Result<RegistrySession<'_>> {
        let guard = self.writer.lock().await;
        let lock = StoreLock::acquire(&self.model_file)?;
        let registry = self.load()?;
        debug!(
            model_file = %self.model_file.display(),
            entities = registry.len(),
            "Registry session opened"
        );
        Ok(RegistrySession {
            _guard: guard,
            _lock: lock,
            model_file: &self.model_file,
            registry,
        })
    }
}

/// Exclusive access to the registry; released on drop
pub struct RegistrySession<'a> {
    _guard: MutexGuard<'a, ()>,
    _lock: StoreLock,
    model_file: &'a Path,
    pub registry: SchemaRegistry,
}

impl RegistrySession<'_> {
    /// Persist the registry, writing only when the rendered text changed
    pub fn commit(&self) -> Result<bool> {
        write_if_changed(self.model_file, &self.registry.render())
    }

    /// Rendered model text as it would be committed
    pub fn model_text(&self) -> String {
        self.registry.render()
    }
}
