//! Load/upsert committer.
//!
//! Applies a Gold batch to the warehouse in one transaction: dimensions
//! first, then facts. A fact that references a dimension row the warehouse
//! does not hold aborts the batch and nothing is written.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

use rusqlite::ErrorCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::{Database, DbError};
use crate::models::{EntityKind, GoldBatch};
use crate::validate::KnownKeys;

/// Commit errors. Any of them rolls back the whole batch.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("{entity} {id}: {column} = {value} has no matching {target} row")]
    MissingReference {
        entity: EntityKind,
        id: String,
        column: &'static str,
        value: String,
        target: EntityKind,
    },

    #[error("{entity} {id} violates a warehouse constraint: {message}")]
    Constraint {
        entity: EntityKind,
        id: String,
        message: String,
    },
}

pub type CommitResult<T> = Result<T, CommitError>;

/// What a commit applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitReport {
    pub batch_id: String,
    /// Rows upserted per table
    pub row_counts: BTreeMap<String, usize>,
    /// Times this batch has now been applied, counting this one
    pub load_count: i64,
}

impl CommitReport {
    pub fn total(&self) -> usize {
        self.row_counts.values().sum()
    }
}

/// Applies Gold batches to a warehouse.
pub struct Committer<'a> {
    db: &'a Database,
}

impl<'a> Committer<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Upsert every record of the batch atomically.
    pub fn commit(&self, batch: &GoldBatch) -> CommitResult<CommitReport> {
        let records = &batch.records;
        let tx = self.db.begin()?;

        for patient in &records.patients {
            self.apply(EntityKind::Patients, patient.id(), || self.db.upsert_patient(patient))?;
        }
        for provider in &records.providers {
            self.apply(EntityKind::Providers, provider.id(), || {
                self.db.upsert_provider(provider)
            })?;
        }
        for medication in &records.medications {
            self.apply(EntityKind::Medications, medication.medication_id, || {
                self.db.upsert_medication(medication)
            })?;
        }
        for code in &records.diagnosis_codes {
            self.apply(EntityKind::DiagnosisCodes, &code.diagnosis_code, || {
                self.db.upsert_diagnosis_code(code)
            })?;
        }

        // Dimension rows written above are visible inside the transaction.
        let keys = self.db.known_keys()?;

        for claim in &records.claims {
            let a = &claim.attributes;
            let fact = Fact::new(EntityKind::Claims, a.claim_id);
            fact.require("patient_id", &a.patient_id, &keys.patients, EntityKind::Patients)?;
            fact.require("provider_id", &a.provider_id, &keys.providers, EntityKind::Providers)?;
            if let Some(code) = &a.diagnosis_code {
                fact.require("diagnosis_code", code, &keys.diagnosis_codes, EntityKind::DiagnosisCodes)?;
            }
            self.apply(EntityKind::Claims, a.claim_id, || self.db.upsert_claim(claim))?;
        }

        for prescription in &records.prescriptions {
            let a = &prescription.attributes;
            let fact = Fact::new(EntityKind::Prescriptions, a.prescription_id);
            check_prescription(&fact, &keys, a.patient_id, a.provider_id, a.medication_id)?;
            self.apply(EntityKind::Prescriptions, a.prescription_id, || {
                self.db.upsert_prescription(prescription)
            })?;
        }

        let row_counts = records.counts();
        self.db
            .record_load_batch(&batch.batch_id, batch.as_of, &row_counts)?;
        let load_count = self
            .db
            .get_load_batch(&batch.batch_id)?
            .map_or(1, |b| b.load_count);

        tx.commit().map_err(DbError::from)?;

        let report = CommitReport {
            batch_id: batch.batch_id.clone(),
            row_counts,
            load_count,
        };
        log::info!(
            "Committed batch {}: {} rows (load #{})",
            report.batch_id,
            report.total(),
            report.load_count
        );
        Ok(report)
    }

    /// Run one upsert, turning SQLite constraint failures into
    /// [`CommitError::Constraint`] for the offending row.
    fn apply<K: Display>(
        &self,
        entity: EntityKind,
        id: K,
        upsert: impl FnOnce() -> Result<(), DbError>,
    ) -> CommitResult<()> {
        upsert().map_err(|err| match err {
            DbError::Sqlite(rusqlite::Error::SqliteFailure(code, message))
                if code.code == ErrorCode::ConstraintViolation =>
            {
                CommitError::Constraint {
                    entity,
                    id: id.to_string(),
                    message: message.unwrap_or_else(|| code.to_string()),
                }
            }
            other => CommitError::Database(other),
        })
    }
}

fn check_prescription(
    fact: &Fact,
    keys: &KnownKeys,
    patient_id: i64,
    provider_id: i64,
    medication_id: Option<i64>,
) -> CommitResult<()> {
    fact.require("patient_id", &patient_id, &keys.patients, EntityKind::Patients)?;
    fact.require("provider_id", &provider_id, &keys.providers, EntityKind::Providers)?;
    if let Some(medication_id) = medication_id {
        fact.require("medication_id", &medication_id, &keys.medications, EntityKind::Medications)?;
    }
    Ok(())
}

/// A fact row being checked against the warehouse's dimension keys.
struct Fact {
    entity: EntityKind,
    id: i64,
}

impl Fact {
    fn new(entity: EntityKind, id: i64) -> Self {
        Self { entity, id }
    }

    fn require<K: Eq + Hash + Display>(
        &self,
        column: &'static str,
        value: &K,
        known: &HashSet<K>,
        target: EntityKind,
    ) -> CommitResult<()> {
        if known.contains(value) {
            return Ok(());
        }
        Err(CommitError::MissingReference {
            entity: self.entity,
            id: self.id.to_string(),
            column,
            value: value.to_string(),
            target,
        })
    }
}
