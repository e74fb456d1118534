//! Claim models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Validated claim fields taken from the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimAttributes {
    /// Claim identity
    pub claim_id: i64,
    pub patient_id: i64,
    pub provider_id: i64,
    /// Canonical diagnosis code; `None` when the claim carries no diagnosis
    pub diagnosis_code: Option<String>,
    /// Upper-cased procedure code
    pub procedure_code: Option<String>,
    pub admission_date: NaiveDate,
    pub discharge_date: Option<NaiveDate>,
    pub readmission_date: Option<NaiveDate>,
    /// Billed amount (> 0)
    pub cost: f64,
    /// Insurance type, "Unknown" when not supplied
    pub insurance_type: String,
}

/// Fields computed from [`ClaimAttributes`]; never read from input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClaimFeatures {
    /// Readmitted within the policy window after discharge
    pub readmission_flag: bool,
    /// Days from admission to discharge; `None` without a discharge date
    pub length_of_stay: Option<i64>,
    /// `None` without a discharge date
    pub cost_per_day: Option<f64>,
    pub cost_category: String,
    /// `None` without a discharge date
    pub los_category: Option<String>,
    pub admission_month: u32,
    pub admission_quarter: u32,
    pub admission_year: i32,
    /// English weekday name, e.g. "Monday"
    pub admission_day_of_week: String,
}

/// A claim fact row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claim {
    #[serde(flatten)]
    pub attributes: ClaimAttributes,
    #[serde(flatten)]
    pub features: ClaimFeatures,
}

impl Claim {
    pub fn id(&self) -> i64 {
        self.attributes.claim_id
    }
}
