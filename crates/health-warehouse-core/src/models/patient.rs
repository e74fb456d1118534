//! Patient models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Administrative gender after standardization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "Unknown",
        }
    }

    /// Parse the canonical stored form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            "Unknown" => Some(Gender::Unknown),
            _ => None,
        }
    }
}

/// Validated patient fields taken from the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientAttributes {
    /// Patient identity
    pub patient_id: i64,
    /// Age in years (0-120)
    pub age: i64,
    /// Standardized gender
    pub gender: Gender,
    /// Race, "Unknown" when not supplied
    pub race: String,
    /// Five character zip code
    pub zip_code: Option<String>,
    /// Insurance type, "Unknown" when not supplied
    pub insurance_type: String,
    /// Number of chronic conditions (>= 0)
    pub chronic_conditions: i64,
    /// Most recent visit
    pub last_visit_date: Option<NaiveDate>,
}

/// Fields computed from [`PatientAttributes`]; never read from input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientFeatures {
    pub age_category: String,
    pub risk_level: String,
    /// Days between the last visit and the run's as-of date
    pub days_since_last_visit: Option<i64>,
    /// Active / Inactive / Dormant, from `days_since_last_visit`
    pub patient_status: Option<String>,
}

/// A patient dimension row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    #[serde(flatten)]
    pub attributes: PatientAttributes,
    #[serde(flatten)]
    pub features: PatientFeatures,
}

impl Patient {
    pub fn id(&self) -> i64 {
        self.attributes.patient_id
    }
}
