//! Entity kinds handled by the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One table of the warehouse, and one input file of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Patients,
    Providers,
    Medications,
    DiagnosisCodes,
    Claims,
    Prescriptions,
}

impl EntityKind {
    /// All entities in load order: dimensions before facts.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Patients,
        EntityKind::Providers,
        EntityKind::Medications,
        EntityKind::DiagnosisCodes,
        EntityKind::Claims,
        EntityKind::Prescriptions,
    ];

    /// Table name, also used as the input file stem and stage directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Patients => "patients",
            EntityKind::Providers => "providers",
            EntityKind::Medications => "medications",
            EntityKind::DiagnosisCodes => "diagnosis_codes",
            EntityKind::Claims => "claims",
            EntityKind::Prescriptions => "prescriptions",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == s)
    }

    /// Dimension tables are upserted before any fact row references them.
    pub fn is_dimension(&self) -> bool {
        !matches!(self, EntityKind::Claims | EntityKind::Prescriptions)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(EntityKind::from_str("visits"), None);
    }

    #[test]
    fn test_dimensions_load_first() {
        let first_fact = EntityKind::ALL
            .iter()
            .position(|k| !k.is_dimension())
            .unwrap();
        assert!(EntityKind::ALL[..first_fact].iter().all(|k| k.is_dimension()));
        assert!(EntityKind::ALL[first_fact..].iter().all(|k| !k.is_dimension()));
    }
}
