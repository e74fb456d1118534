//! Prescription models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Validated prescription fields taken from the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionAttributes {
    /// Prescription identity
    pub prescription_id: i64,
    pub patient_id: i64,
    pub provider_id: i64,
    /// Resolved medication, either given directly or looked up by name
    pub medication_id: Option<i64>,
    pub prescription_date: NaiveDate,
    /// Days of medication dispensed (> 0)
    pub days_supplied: i64,
    /// Days of therapy prescribed (> 0)
    pub days_prescribed: i64,
    /// Units dispensed (> 0)
    pub quantity: i64,
    /// Dispensed cost (> 0)
    pub cost: f64,
}

/// Fields computed from [`PrescriptionAttributes`]; never read from input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PrescriptionFeatures {
    /// `days_supplied / days_prescribed`, clamped to [0, 1]
    pub adherence_rate: f64,
    pub adherence_category: String,
    /// `cost / days_supplied`
    pub cost_per_day: f64,
    pub prescription_month: u32,
    pub prescription_quarter: u32,
    pub prescription_year: i32,
}

/// A prescription fact row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    #[serde(flatten)]
    pub attributes: PrescriptionAttributes,
    #[serde(flatten)]
    pub features: PrescriptionFeatures,
}

impl Prescription {
    pub fn id(&self) -> i64 {
        self.attributes.prescription_id
    }
}
