//! Static reference data: medications and diagnosis codes.

use serde::{Deserialize, Serialize};

/// A medication in the formulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    /// Medication identity
    pub medication_id: i64,
    /// Unique, title-cased name
    pub medication_name: String,
    /// Therapeutic category, "Other" when not supplied
    pub medication_category: String,
}

/// An ICD-10 style diagnosis code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisCode {
    /// Canonical code (upper case, dotted), e.g. "E11.9"
    pub diagnosis_code: String,
    pub description: String,
    pub category: Option<String>,
}
