//! Validate and derive a whole batch.
//!
//! Rows are validated and derived in parallel; duplicate detection and
//! rejection bookkeeping happen afterwards in one sequential pass so the
//! outcome never depends on scheduling.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rayon::prelude::*;

use crate::config::PipelineConfig;
use crate::derive::FeatureDeriver;
use crate::models::{CuratedBatch, EntityKind, RawRecord};
use crate::validate::{
    DuplicateTracker, KnownKeys, Rejection, ValidationError, ValidationResult, Validator,
};

/// Source rows of one batch, keyed by entity.
pub type RawBatch = BTreeMap<EntityKind, Vec<RawRecord>>;

/// Result of transforming a batch.
#[derive(Debug, Clone, Default)]
pub struct Transformed {
    pub records: CuratedBatch,
    /// In load order, then source row order
    pub rejections: Vec<Rejection>,
    /// Rows read per entity
    pub read: BTreeMap<EntityKind, usize>,
}

impl Transformed {
    pub fn accepted(&self) -> BTreeMap<EntityKind, usize> {
        EntityKind::ALL
            .iter()
            .map(|entity| (*entity, self.records.count(*entity)))
            .collect()
    }
}

/// Validate and derive every row of a batch. `warehouse_keys` holds the
/// dimension keys already loaded; dimension rows accepted from this batch
/// are added before facts are checked.
pub fn transform_batch(
    config: &PipelineConfig,
    as_of: NaiveDate,
    raw: &RawBatch,
    warehouse_keys: KnownKeys,
) -> Transformed {
    let validator = Validator::new(&config.validation, as_of);
    let deriver = FeatureDeriver::new(&config.deriver, as_of);
    let rows = |entity: EntityKind| raw.get(&entity).map(Vec::as_slice).unwrap_or(&[]);

    let mut out = Transformed {
        read: EntityKind::ALL
            .iter()
            .map(|entity| (*entity, rows(*entity).len()))
            .collect(),
        ..Default::default()
    };
    let rejections = &mut out.rejections;

    let mut patient_ids = DuplicateTracker::new("patient_id");
    out.records.patients = process(
        EntityKind::Patients,
        rows(EntityKind::Patients),
        |raw| Ok(deriver.patient(validator.validate_patient(raw)?)?),
        |patient, row| patient_ids.check(patient.id(), row),
        rejections,
    );

    let mut provider_ids = DuplicateTracker::new("provider_id");
    out.records.providers = process(
        EntityKind::Providers,
        rows(EntityKind::Providers),
        |raw| Ok(deriver.provider(validator.validate_provider(raw)?)?),
        |provider, row| provider_ids.check(provider.id(), row),
        rejections,
    );

    // Both keys are checked before either is recorded, so a row rejected
    // for its name does not claim its id.
    let mut medication_ids = DuplicateTracker::new("medication_id");
    let mut medication_names = DuplicateTracker::new("medication_name");
    out.records.medications = process(
        EntityKind::Medications,
        rows(EntityKind::Medications),
        |raw| validator.validate_medication(raw),
        |medication, row| {
            let id = medication.medication_id;
            let name = medication.medication_name.trim().to_lowercase();
            match warehouse_keys.medication_names.get(&name) {
                Some(existing) if *existing != id => {
                    return Err(ValidationError::ConflictingKey {
                        field: "medication_name",
                        value: medication.medication_name.clone(),
                        target: EntityKind::Medications,
                        existing: existing.to_string(),
                    })
                }
                _ => {}
            }
            medication_ids.ensure_new(&id)?;
            medication_names.ensure_new(&name)?;
            medication_ids.record(id, row);
            medication_names.record(name, row);
            Ok(())
        },
        rejections,
    );

    let mut codes = DuplicateTracker::new("diagnosis_code");
    out.records.diagnosis_codes = process(
        EntityKind::DiagnosisCodes,
        rows(EntityKind::DiagnosisCodes),
        |raw| validator.validate_diagnosis_code(raw),
        |code, row| codes.check(code.diagnosis_code.clone(), row),
        rejections,
    );

    let mut keys = warehouse_keys;
    keys.extend_from_batch(&out.records);

    let mut claim_ids = DuplicateTracker::new("claim_id");
    out.records.claims = process(
        EntityKind::Claims,
        rows(EntityKind::Claims),
        |raw| Ok(deriver.claim(validator.validate_claim(raw, &keys)?)?),
        |claim, row| claim_ids.check(claim.id(), row),
        rejections,
    );

    let mut prescription_ids = DuplicateTracker::new("prescription_id");
    out.records.prescriptions = process(
        EntityKind::Prescriptions,
        rows(EntityKind::Prescriptions),
        |raw| Ok(deriver.prescription(validator.validate_prescription(raw, &keys)?)?),
        |prescription, row| prescription_ids.check(prescription.id(), row),
        rejections,
    );

    for entity in EntityKind::ALL {
        log::info!(
            "{}: {} read, {} accepted",
            entity,
            out.read.get(&entity).copied().unwrap_or(0),
            out.records.count(entity)
        );
    }
    out
}

/// Build every row in parallel, then apply `unique` to the survivors in
/// source order. Failures become rejections.
fn process<T, B, U>(
    entity: EntityKind,
    rows: &[RawRecord],
    build: B,
    mut unique: U,
    rejections: &mut Vec<Rejection>,
) -> Vec<T>
where
    T: Send,
    B: Fn(&RawRecord) -> ValidationResult<T> + Sync,
    U: FnMut(&T, usize) -> ValidationResult<()>,
{
    let built: Vec<ValidationResult<T>> = rows.par_iter().map(|raw| build(raw)).collect();

    let mut accepted = Vec::with_capacity(built.len());
    for (raw, result) in rows.iter().zip(built) {
        match result.and_then(|record| unique(&record, raw.row).map(|_| record)) {
            Ok(record) => accepted.push(record),
            Err(err) => reject(entity, raw, err, rejections),
        }
    }
    accepted
}

fn reject(entity: EntityKind, raw: &RawRecord, err: ValidationError, rejections: &mut Vec<Rejection>) {
    log::debug!("Rejected {} row {}: {}", entity, raw.row, err);
    rejections.push(Rejection::new(entity, raw, &err));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::Rule;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn batch() -> RawBatch {
        let mut raw = RawBatch::new();
        raw.insert(
            EntityKind::Patients,
            vec![
                RawRecord::new(1, [("patient_id", "1"), ("age", "40"), ("gender", "M")]),
                RawRecord::new(2, [("patient_id", "2"), ("age", "12"), ("gender", "F")]),
                RawRecord::new(3, [("patient_id", "1"), ("age", "41"), ("gender", "M")]),
            ],
        );
        raw.insert(
            EntityKind::Providers,
            vec![RawRecord::new(
                1,
                [("provider_id", "10"), ("hospital_name", "General"), ("state", "NY"), ("beds", "120")],
            )],
        );
        raw.insert(
            EntityKind::Claims,
            vec![
                RawRecord::new(
                    1,
                    [
                        ("claim_id", "1"),
                        ("patient_id", "2"),
                        ("provider_id", "10"),
                        ("admission_date", "2024-02-01"),
                        ("cost", "800"),
                    ],
                ),
                RawRecord::new(
                    2,
                    [
                        ("claim_id", "2"),
                        ("patient_id", "3"),
                        ("provider_id", "10"),
                        ("admission_date", "2024-02-01"),
                        ("cost", "800"),
                    ],
                ),
            ],
        );
        raw
    }

    #[test]
    fn test_duplicates_and_references() {
        let out = transform_batch(&PipelineConfig::default(), as_of(), &batch(), KnownKeys::new());

        assert_eq!(out.records.patients.len(), 2);
        assert_eq!(out.records.patients[0].attributes.age, 40);
        assert_eq!(out.records.claims.len(), 1);

        let rules: Vec<(EntityKind, usize, Rule)> = out
            .rejections
            .iter()
            .map(|r| (r.entity, r.row, r.rule))
            .collect();
        assert_eq!(
            rules,
            vec![
                (EntityKind::Patients, 3, Rule::DuplicateKey),
                (EntityKind::Claims, 2, Rule::UnknownReference),
            ]
        );
        assert_eq!(out.read[&EntityKind::Patients], 3);
        assert_eq!(out.accepted()[&EntityKind::Patients], 2);
    }

    #[test]
    fn test_warehouse_keys_satisfy_references() {
        let mut keys = KnownKeys::new();
        keys.patients.insert(3);
        let out = transform_batch(&PipelineConfig::default(), as_of(), &batch(), keys);
        assert_eq!(out.records.claims.len(), 2);
    }

    #[test]
    fn test_duplicate_medication_names() {
        let mut raw = RawBatch::new();
        raw.insert(
            EntityKind::Medications,
            vec![
                RawRecord::new(1, [("medication_id", "1"), ("medication_name", "Metformin")]),
                RawRecord::new(2, [("medication_id", "2"), ("medication_name", "METFORMIN")]),
            ],
        );
        let out = transform_batch(&PipelineConfig::default(), as_of(), &raw, KnownKeys::new());
        assert_eq!(out.records.medications.len(), 1);
        assert_eq!(out.rejections[0].rule, Rule::DuplicateKey);
    }

    fn medications(rows: &[(&str, &str)]) -> RawBatch {
        let mut raw = RawBatch::new();
        raw.insert(
            EntityKind::Medications,
            rows.iter()
                .enumerate()
                .map(|(i, (id, name))| {
                    RawRecord::new(i + 1, [("medication_id", *id), ("medication_name", *name)])
                })
                .collect(),
        );
        raw
    }

    #[test]
    fn test_medication_rejected_for_name_does_not_claim_id() {
        let raw = medications(&[("1", "Aspirin"), ("2", "aspirin"), ("2", "Lisinopril")]);
        let out = transform_batch(&PipelineConfig::default(), as_of(), &raw, KnownKeys::new());

        let accepted: Vec<(i64, &str)> = out
            .records
            .medications
            .iter()
            .map(|m| (m.medication_id, m.medication_name.as_str()))
            .collect();
        assert_eq!(accepted, vec![(1, "Aspirin"), (2, "Lisinopril")]);
        assert_eq!(out.rejections.len(), 1);
        assert_eq!(out.rejections[0].row, 2);
    }

    #[test]
    fn test_medication_name_held_by_other_warehouse_id_is_rejected() {
        let mut keys = KnownKeys::new();
        keys.add_medication(1, "Metformin");
        let raw = medications(&[("2", "metformin"), ("3", "Lisinopril"), ("1", "METFORMIN")]);
        let out = transform_batch(&PipelineConfig::default(), as_of(), &raw, keys);

        let ids: Vec<i64> = out.records.medications.iter().map(|m| m.medication_id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(out.rejections.len(), 1);
        assert_eq!(out.rejections[0].row, 1);
        assert_eq!(out.rejections[0].rule, Rule::DuplicateKey);
    }

    #[test]
    fn test_rejected_first_row_does_not_shadow_later_row() {
        let mut raw = RawBatch::new();
        raw.insert(
            EntityKind::Patients,
            vec![
                RawRecord::new(1, [("patient_id", "1"), ("age", "400")]),
                RawRecord::new(2, [("patient_id", "1"), ("age", "40")]),
            ],
        );
        let out = transform_batch(&PipelineConfig::default(), as_of(), &raw, KnownKeys::new());
        assert_eq!(out.records.patients.len(), 1);
        assert_eq!(out.rejections.len(), 1);
        assert_eq!(out.rejections[0].rule, Rule::OutOfRange);
    }
}
