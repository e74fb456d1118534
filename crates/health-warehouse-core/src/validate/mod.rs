//! Record validator.
//!
//! Checks run in order and stop at the first failure:
//!
//! 1. Required fields present and typed (schema driven)
//! 2. Domain rules: ranges, enums, foreign keys
//! 3. Cross-field rules: date ordering, stay length, recency
//!
//! Duplicate keys are checked afterwards over the accepted rows of a whole
//! batch, see [`DuplicateTracker`].

mod keys;
mod normalizer;
mod rejection;

pub use keys::*;
pub use normalizer::*;
pub use rejection::*;

use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;

use chrono::NaiveDate;

use crate::config::ValidationConfig;
use crate::ingest::{TableSchema, TypedRow};
use crate::models::{
    ClaimAttributes, DiagnosisCode, EntityKind, Medication, PatientAttributes,
    PrescriptionAttributes, ProviderAttributes, ProviderType, RawRecord,
};

const UNKNOWN: &str = "Unknown";

/// Validates raw rows into typed attributes.
pub struct Validator<'a> {
    config: &'a ValidationConfig,
    as_of: NaiveDate,
    normalizer: Normalizer,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a ValidationConfig, as_of: NaiveDate) -> Self {
        Self {
            config,
            as_of,
            normalizer: Normalizer::new(),
        }
    }

    pub fn validate_patient(&self, raw: &RawRecord) -> ValidationResult<PatientAttributes> {
        let row = parse(EntityKind::Patients, raw)?;

        let age = row.require_integer("age")?;
        in_range("age", age, self.config.min_age, self.config.max_age)?;

        let gender_text = row.text("gender");
        let gender = self
            .normalizer
            .gender(gender_text)
            .ok_or_else(|| ValidationError::InvalidEnum {
                field: "gender",
                value: gender_text.unwrap_or_default().to_string(),
                allowed: "M, F, Male, Female, 1, 0, U, Unknown".into(),
            })?;

        let chronic_conditions = row.integer("chronic_conditions").unwrap_or(0);
        at_least("chronic_conditions", chronic_conditions, 0)?;

        let last_visit_date = row.date("last_visit_date");
        if let Some(visit) = last_visit_date {
            if visit > self.as_of {
                return Err(ValidationError::FutureDate {
                    field: "last_visit_date",
                    value: visit,
                    as_of: self.as_of,
                });
            }
        }

        Ok(PatientAttributes {
            patient_id: row.require_integer("patient_id")?,
            age,
            gender,
            race: text_or(&row, "race", UNKNOWN),
            zip_code: row.text("zip_code").map(|z| self.normalizer.zip_code(z)),
            insurance_type: text_or(&row, "insurance_type", UNKNOWN),
            chronic_conditions,
            last_visit_date,
        })
    }

    pub fn validate_provider(&self, raw: &RawRecord) -> ValidationResult<ProviderAttributes> {
        let row = parse(EntityKind::Providers, raw)?;

        let provider_type = match row.text("provider_type") {
            None => ProviderType::Hospital,
            Some(text) => ProviderType::from_str(text).ok_or_else(|| ValidationError::InvalidEnum {
                field: "provider_type",
                value: text.to_string(),
                allowed: ProviderType::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })?,
        };

        let state = self.normalizer.upper(row.require_text("state")?);
        if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidFormat {
                field: "state",
                value: state,
                expected: "a two letter state code",
            });
        }

        let beds = row.require_integer("beds")?;
        at_least("beds", beds, 1)?;

        Ok(ProviderAttributes {
            provider_id: row.require_integer("provider_id")?,
            hospital_name: self.normalizer.title_case(row.require_text("hospital_name")?),
            provider_type,
            state,
            city: row
                .text("city")
                .map(|c| self.normalizer.title_case(c))
                .unwrap_or_else(|| UNKNOWN.to_string()),
            beds,
            teaching_hospital: row.boolean("teaching_hospital").unwrap_or(false),
        })
    }

    pub fn validate_medication(&self, raw: &RawRecord) -> ValidationResult<Medication> {
        let row = parse(EntityKind::Medications, raw)?;
        Ok(Medication {
            medication_id: row.require_integer("medication_id")?,
            medication_name: self.normalizer.title_case(row.require_text("medication_name")?),
            medication_category: text_or(&row, "medication_category", "Other"),
        })
    }

    pub fn validate_diagnosis_code(&self, raw: &RawRecord) -> ValidationResult<DiagnosisCode> {
        let row = parse(EntityKind::DiagnosisCodes, raw)?;
        let code = row.require_text("diagnosis_code")?;
        Ok(DiagnosisCode {
            diagnosis_code: self.canonical_code(code)?,
            description: row.require_text("description")?.to_string(),
            category: row.text("category").map(str::to_string),
        })
    }

    pub fn validate_claim(
        &self,
        raw: &RawRecord,
        keys: &KnownKeys,
    ) -> ValidationResult<ClaimAttributes> {
        let row = parse(EntityKind::Claims, raw)?;

        let cost = row.require_float("cost")?;
        positive("cost", cost)?;

        let patient_id = row.require_integer("patient_id")?;
        reference("patient_id", &patient_id, &keys.patients, EntityKind::Patients)?;
        let provider_id = row.require_integer("provider_id")?;
        reference("provider_id", &provider_id, &keys.providers, EntityKind::Providers)?;

        let diagnosis_code = match row.text("diagnosis_code") {
            None => None,
            Some(code) => {
                let code = self.canonical_code(code)?;
                reference(
                    "diagnosis_code",
                    &code,
                    &keys.diagnosis_codes,
                    EntityKind::DiagnosisCodes,
                )?;
                Some(code)
            }
        };

        let admission_date = row.require_date("admission_date")?;
        let discharge_date = row.date("discharge_date");
        let readmission_date = row.date("readmission_date");

        if let Some(discharge) = discharge_date {
            not_before("admission_date", admission_date, "discharge_date", discharge)?;
            let stay = (discharge - admission_date).num_days();
            if stay > self.config.max_length_of_stay_days {
                return Err(ValidationError::OutOfRange {
                    field: "length_of_stay",
                    value: stay.to_string(),
                    expected: format!("0..={} days", self.config.max_length_of_stay_days),
                });
            }
            if let Some(readmission) = readmission_date {
                not_before("discharge_date", discharge, "readmission_date", readmission)?;
            }
        }

        if cost > self.config.high_cost_warning {
            log::warn!(
                "claims row {}: unusually high cost {:.2} (threshold {:.2})",
                raw.row,
                cost,
                self.config.high_cost_warning
            );
        }

        Ok(ClaimAttributes {
            claim_id: row.require_integer("claim_id")?,
            patient_id,
            provider_id,
            diagnosis_code,
            procedure_code: row.text("procedure_code").map(|c| self.normalizer.upper(c)),
            admission_date,
            discharge_date,
            readmission_date,
            cost,
            insurance_type: text_or(&row, "insurance_type", UNKNOWN),
        })
    }

    pub fn validate_prescription(
        &self,
        raw: &RawRecord,
        keys: &KnownKeys,
    ) -> ValidationResult<PrescriptionAttributes> {
        let row = parse(EntityKind::Prescriptions, raw)?;

        let days_supplied = row.require_integer("days_supplied")?;
        at_least("days_supplied", days_supplied, 1)?;
        let days_prescribed = row.require_integer("days_prescribed")?;
        at_least("days_prescribed", days_prescribed, 1)?;
        let quantity = row.require_integer("quantity")?;
        at_least("quantity", quantity, 1)?;
        let cost = row.require_float("cost")?;
        positive("cost", cost)?;

        let patient_id = row.require_integer("patient_id")?;
        reference("patient_id", &patient_id, &keys.patients, EntityKind::Patients)?;
        let provider_id = row.require_integer("provider_id")?;
        reference("provider_id", &provider_id, &keys.providers, EntityKind::Providers)?;

        let medication_id = match (row.integer("medication_id"), row.text("medication_name")) {
            (Some(id), _) => {
                reference("medication_id", &id, &keys.medications, EntityKind::Medications)?;
                Some(id)
            }
            (None, Some(name)) => Some(keys.medication_by_name(name).ok_or_else(|| {
                ValidationError::UnknownReference {
                    field: "medication_name",
                    value: name.to_string(),
                    target: EntityKind::Medications,
                }
            })?),
            (None, None) => None,
        };

        Ok(PrescriptionAttributes {
            prescription_id: row.require_integer("prescription_id")?,
            patient_id,
            provider_id,
            medication_id,
            prescription_date: row.require_date("prescription_date")?,
            days_supplied,
            days_prescribed,
            quantity,
            cost,
        })
    }

    fn canonical_code(&self, code: &str) -> ValidationResult<String> {
        self.normalizer
            .diagnosis_code(code)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "diagnosis_code",
                value: code.to_string(),
                expected: "an ICD-10 style code",
            })
    }
}

/// First-occurrence-wins duplicate detection over accepted rows, fed in
/// source order.
pub struct DuplicateTracker<K> {
    field: &'static str,
    seen: HashMap<K, usize>,
}

impl<K: Eq + Hash + Display> DuplicateTracker<K> {
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            seen: HashMap::new(),
        }
    }

    /// Record `key` from source row `row`, failing if it was seen before.
    pub fn check(&mut self, key: K, row: usize) -> ValidationResult<()> {
        self.ensure_new(&key)?;
        self.record(key, row);
        Ok(())
    }

    /// Fail if `key` was seen before, without recording it.
    pub fn ensure_new(&self, key: &K) -> ValidationResult<()> {
        match self.seen.get(key) {
            Some(first_row) => Err(ValidationError::DuplicateKey {
                field: self.field,
                value: key.to_string(),
                first_row: *first_row,
            }),
            None => Ok(()),
        }
    }

    /// Record `key` as first seen at `row`.
    pub fn record(&mut self, key: K, row: usize) {
        self.seen.entry(key).or_insert(row);
    }
}

fn parse(entity: EntityKind, raw: &RawRecord) -> ValidationResult<TypedRow> {
    Ok(TableSchema::for_entity(entity).parse(raw)?)
}

fn text_or(row: &TypedRow, field: &str, default: &str) -> String {
    row.text(field).unwrap_or(default).to_string()
}

fn in_range(field: &'static str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value: value.to_string(),
            expected: format!("{}..={}", min, max),
        });
    }
    Ok(())
}

fn at_least(field: &'static str, value: i64, min: i64) -> ValidationResult<()> {
    if value < min {
        return Err(ValidationError::OutOfRange {
            field,
            value: value.to_string(),
            expected: format!(">= {}", min),
        });
    }
    Ok(())
}

fn positive(field: &'static str, value: f64) -> ValidationResult<()> {
    if !(value > 0.0) {
        return Err(ValidationError::OutOfRange {
            field,
            value: value.to_string(),
            expected: "> 0".into(),
        });
    }
    Ok(())
}

fn reference<K: Eq + Hash + Display>(
    field: &'static str,
    value: &K,
    known: &HashSet<K>,
    target: EntityKind,
) -> ValidationResult<()> {
    if !known.contains(value) {
        return Err(ValidationError::UnknownReference {
            field,
            value: value.to_string(),
            target,
        });
    }
    Ok(())
}

fn not_before(
    earlier: &'static str,
    earlier_value: NaiveDate,
    later: &'static str,
    later_value: NaiveDate,
) -> ValidationResult<()> {
    if later_value < earlier_value {
        return Err(ValidationError::DateOrder {
            earlier,
            earlier_value,
            later,
            later_value,
        });
    }
    Ok(())
}
