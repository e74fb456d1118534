//! A complete set of curated records for one batch.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Claim, DiagnosisCode, EntityKind, Medication, Patient, Prescription, Provider};

/// Validated and derived records of every entity, as staged in Silver and
/// Gold and as handed to the committer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CuratedBatch {
    pub patients: Vec<Patient>,
    pub providers: Vec<Provider>,
    pub medications: Vec<Medication>,
    pub diagnosis_codes: Vec<DiagnosisCode>,
    pub claims: Vec<Claim>,
    pub prescriptions: Vec<Prescription>,
}

impl CuratedBatch {
    /// Record count for one entity.
    pub fn count(&self, entity: EntityKind) -> usize {
        match entity {
            EntityKind::Patients => self.patients.len(),
            EntityKind::Providers => self.providers.len(),
            EntityKind::Medications => self.medications.len(),
            EntityKind::DiagnosisCodes => self.diagnosis_codes.len(),
            EntityKind::Claims => self.claims.len(),
            EntityKind::Prescriptions => self.prescriptions.len(),
        }
    }

    /// Record counts keyed by table name.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        EntityKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), self.count(*kind)))
            .collect()
    }

    pub fn total(&self) -> usize {
        EntityKind::ALL.iter().map(|kind| self.count(*kind)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// A Gold-stage batch ready to be committed to the warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoldBatch {
    /// Content-derived batch identity
    pub batch_id: String,
    /// Logical date the batch was processed for
    pub as_of: NaiveDate,
    pub records: CuratedBatch,
}
