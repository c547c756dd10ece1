use std::collections::HashMap;

use serde::Serialize;

use crate::application::use_cases::type_inference::{FieldObservation, TypeInferencer};
use crate::domain::dataset::{FieldType, Record};

/// Dominant type of one field across a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedField {
    pub name: String,
    pub field_type: FieldType,
    /// Non-skip observations that voted
    pub votes: usize,
}

/// Running vote count of one field. The leader only changes when a type
/// overtakes it, so a tie goes to the type that reached the count first.
#[derive(Debug, Default)]
struct FieldTally {
    name: String,
    counts: Vec<(FieldType, usize)>,
    leader: Option<(FieldType, usize)>,
}

impl FieldTally {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    fn vote(&mut self, field_type: FieldType) {
        if !field_type.votes() {
            return;
        }
        let count = match self.counts.iter_mut().find(|(t, _)| *t == field_type) {
            Some((_, count)) => {
                *count += 1;
                *count
            }
            None => {
                self.counts.push((field_type, 1));
                1
            }
        };
        match self.leader {
            Some((_, best)) if count <= best => {}
            _ => self.leader = Some((field_type, count)),
        }
    }

    /// No votes mean string
    fn finish(self) -> AggregatedField {
        AggregatedField {
            name: self.name,
            field_type: self.leader.map(|(t, _)| t).unwrap_or(FieldType::String),
            votes: self.counts.iter().map(|(_, c)| c).sum(),
        }
    }
}

/// Reduce per-record observations into one type per field.
/// Fields keep the order in which they were first observed.
#[derive(Debug, Default)]
pub struct FieldTypeAggregator {
    tallies: Vec<FieldTally>,
    index: HashMap<String, usize>,
}

impl FieldTypeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, observation: &FieldObservation) {
        let idx = match self.index.get(&observation.field) {
            Some(idx) => *idx,
            None => {
                self.tallies.push(FieldTally::new(observation.field.clone()));
                self.index
                    .insert(observation.field.clone(), self.tallies.len() - 1);
                self.tallies.len() - 1
            }
        };
        self.tallies[idx].vote(observation.field_type);
    }

    pub fn add_all<'a>(&mut self, observations: impl IntoIterator<Item = &'a FieldObservation>) {
        for observation in observations {
            self.add(observation);
        }
    }

    pub fn finish(self) -> Vec<AggregatedField> {
        self.tallies.into_iter().map(FieldTally::finish).collect()
    }
}

/// Infer and aggregate every field of a dataset
pub fn aggregate_records(records: &[Record], inferencer: &TypeInferencer) -> Vec<AggregatedField> {
    let mut aggregator = FieldTypeAggregator::new();
    for record in records {
        aggregator.add_all(&inferencer.observe(record));
    }
    aggregator.finish()
}
