//! Feature deriver.
//!
//! Computes every derived column from validated attributes. Derived
//! values are always recomputed here; anything the input carried under a
//! derived column name was dropped by the validator.

mod features;

pub use features::*;

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::config::{Buckets, Boundary, DeriverConfig};
use crate::models::{
    Claim, ClaimAttributes, ClaimFeatures, HospitalSize, Patient, PatientAttributes,
    PatientFeatures, Prescription, PrescriptionAttributes, PrescriptionFeatures, Provider,
    ProviderAttributes, ProviderFeatures,
};

/// A row whose features cannot be computed. The row is rejected, the
/// batch continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DerivationError {
    #[error("cannot compute {field}: {divisor} is zero")]
    ZeroDivisor {
        field: &'static str,
        divisor: &'static str,
    },

    #[error("{field} value {value} is below every configured band")]
    Unclassified { field: &'static str, value: String },

    #[error("{field} band label {label:?} is not recognised")]
    UnknownLabel { field: &'static str, label: String },
}

pub type DerivationResult<T> = Result<T, DerivationError>;

/// Derives features for one run. `as_of` is the run's logical date, used
/// for recency features instead of the wall clock.
pub struct FeatureDeriver<'a> {
    config: &'a DeriverConfig,
    as_of: NaiveDate,
}

impl<'a> FeatureDeriver<'a> {
    pub fn new(config: &'a DeriverConfig, as_of: NaiveDate) -> Self {
        Self { config, as_of }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn patient(&self, attributes: PatientAttributes) -> DerivationResult<Patient> {
        let days_since_last_visit = attributes
            .last_visit_date
            .map(|visit| days_between(visit, self.as_of));

        let features = PatientFeatures {
            age_category: classify(&self.config.age_categories, attributes.age, "age_category")?,
            risk_level: classify(
                &self.config.risk_levels,
                attributes.chronic_conditions,
                "risk_level",
            )?,
            days_since_last_visit,
            patient_status: days_since_last_visit
                .map(|days| patient_status(days, &self.config.patient_status).to_string()),
        };
        Ok(Patient {
            attributes,
            features,
        })
    }

    pub fn provider(&self, attributes: ProviderAttributes) -> DerivationResult<Provider> {
        let label = classify(&self.config.hospital_sizes, attributes.beds, "hospital_size")?;
        let hospital_size =
            HospitalSize::from_label(&label).ok_or(DerivationError::UnknownLabel {
                field: "hospital_size",
                label,
            })?;

        let features = ProviderFeatures {
            hospital_size,
            full_address: full_address(&attributes.city, &attributes.state),
        };
        Ok(Provider {
            attributes,
            features,
        })
    }

    pub fn claim(&self, attributes: ClaimAttributes) -> DerivationResult<Claim> {
        let admission = attributes.admission_date;
        let los = length_of_stay(admission, attributes.discharge_date);

        let cost_per_day = los
            .map(|days| claim_cost_per_day(attributes.cost, days))
            .transpose()?;
        let los_category = los
            .map(|days| classify(&self.config.los_categories, days, "los_category"))
            .transpose()?;

        let features = ClaimFeatures {
            readmission_flag: readmission_flag(
                attributes.discharge_date,
                attributes.readmission_date,
                self.config.readmission_window_days,
            ),
            length_of_stay: los,
            cost_per_day,
            cost_category: classify(&self.config.cost_categories, attributes.cost, "cost_category")?,
            los_category,
            admission_month: admission.month(),
            admission_quarter: quarter(admission),
            admission_year: admission.year(),
            admission_day_of_week: weekday_name(admission).to_string(),
        };
        Ok(Claim {
            attributes,
            features,
        })
    }

    pub fn prescription(
        &self,
        attributes: PrescriptionAttributes,
    ) -> DerivationResult<Prescription> {
        let adherence_rate = adherence_rate(attributes.days_supplied, attributes.days_prescribed)?;
        let date = attributes.prescription_date;

        let features = PrescriptionFeatures {
            adherence_rate,
            adherence_category: classify(
                &self.config.adherence_categories,
                adherence_rate,
                "adherence_category",
            )?,
            cost_per_day: per_day(
                attributes.cost,
                attributes.days_supplied,
                "cost_per_day",
                "days_supplied",
            )?,
            prescription_month: date.month(),
            prescription_quarter: quarter(date),
            prescription_year: date.year(),
        };
        Ok(Prescription {
            attributes,
            features,
        })
    }
}

fn classify<T: Boundary>(
    buckets: &Buckets<T>,
    value: T,
    field: &'static str,
) -> DerivationResult<String> {
    buckets
        .classify(value)
        .map(str::to_string)
        .ok_or_else(|| DerivationError::Unclassified {
            field,
            value: value.to_string(),
        })
}
