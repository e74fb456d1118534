//! Provider models.

use serde::{Deserialize, Serialize};

/// Facility type of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderType {
    Hospital,
    Clinic,
    Emergency,
    Specialty,
}

impl ProviderType {
    pub const ALL: [ProviderType; 4] = [
        ProviderType::Hospital,
        ProviderType::Clinic,
        ProviderType::Emergency,
        ProviderType::Specialty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::Hospital => "Hospital",
            ProviderType::Clinic => "Clinic",
            ProviderType::Emergency => "Emergency",
            ProviderType::Specialty => "Specialty",
        }
    }

    /// Case-insensitive parse.
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// Facility size class derived from bed count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HospitalSize {
    Small,
    Medium,
    Large,
    #[serde(rename = "Very Large")]
    VeryLarge,
}

impl HospitalSize {
    pub const ALL: [HospitalSize; 4] = [
        HospitalSize::Small,
        HospitalSize::Medium,
        HospitalSize::Large,
        HospitalSize::VeryLarge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HospitalSize::Small => "Small",
            HospitalSize::Medium => "Medium",
            HospitalSize::Large => "Large",
            HospitalSize::VeryLarge => "Very Large",
        }
    }

    /// Parse a bucket label. Exact match only.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == label)
    }
}

/// Validated provider fields taken from the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderAttributes {
    /// Provider identity
    pub provider_id: i64,
    /// Title-cased hospital name
    pub hospital_name: String,
    /// Facility type, Hospital when not supplied
    pub provider_type: ProviderType,
    /// Two letter state code, upper case
    pub state: String,
    /// Title-cased city, "Unknown" when not supplied
    pub city: String,
    /// Licensed beds (> 0)
    pub beds: i64,
    /// Teaching hospital flag
    pub teaching_hospital: bool,
}

/// Fields computed from [`ProviderAttributes`].
///
/// Cost, readmission and volume aggregates are not stored here; they are
/// projected from claims at read time (see `provider_metrics`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderFeatures {
    pub hospital_size: HospitalSize,
    /// "City, ST"
    pub full_address: String,
}

/// A provider dimension row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provider {
    #[serde(flatten)]
    pub attributes: ProviderAttributes,
    #[serde(flatten)]
    pub features: ProviderFeatures,
}

impl Provider {
    pub fn id(&self) -> i64 {
        self.attributes.provider_id
    }
}
