//! Dimension keys that fact rows may reference.

use std::collections::{HashMap, HashSet};

use crate::models::CuratedBatch;

/// Keys of every dimension row available to a batch: rows already in the
/// warehouse plus rows accepted earlier in the same batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnownKeys {
    pub patients: HashSet<i64>,
    pub providers: HashSet<i64>,
    pub medications: HashSet<i64>,
    /// Canonical diagnosis codes
    pub diagnosis_codes: HashSet<String>,
    /// Lower-cased medication name to id
    pub medication_names: HashMap<String, i64>,
}

impl KnownKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_medication(&mut self, medication_id: i64, name: &str) {
        self.medications.insert(medication_id);
        self.medication_names
            .insert(name.trim().to_lowercase(), medication_id);
    }

    /// Add the dimension keys of a curated batch.
    pub fn extend_from_batch(&mut self, batch: &CuratedBatch) {
        self.patients.extend(batch.patients.iter().map(|p| p.id()));
        self.providers.extend(batch.providers.iter().map(|p| p.id()));
        for medication in &batch.medications {
            self.add_medication(medication.medication_id, &medication.medication_name);
        }
        self.diagnosis_codes.extend(
            batch
                .diagnosis_codes
                .iter()
                .map(|d| d.diagnosis_code.clone()),
        );
    }

    /// Case-insensitive medication lookup.
    pub fn medication_by_name(&self, name: &str) -> Option<i64> {
        self.medication_names.get(&name.trim().to_lowercase()).copied()
    }
}
