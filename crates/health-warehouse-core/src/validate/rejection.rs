//! Row-level validation failures.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::derive::DerivationError;
use crate::ingest::FieldError;
use crate::models::{EntityKind, RawRecord};

/// Category of a rejection, used to aggregate reasons in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    MissingField,
    InvalidType,
    OutOfRange,
    InvalidFormat,
    InvalidEnum,
    UnknownReference,
    DuplicateKey,
    DateOrder,
    FutureDate,
    Derivation,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::MissingField => "missing_field",
            Rule::InvalidType => "invalid_type",
            Rule::OutOfRange => "out_of_range",
            Rule::InvalidFormat => "invalid_format",
            Rule::InvalidEnum => "invalid_enum",
            Rule::UnknownReference => "unknown_reference",
            Rule::DuplicateKey => "duplicate_key",
            Rule::DateOrder => "date_order",
            Rule::FutureDate => "future_date",
            Rule::Derivation => "derivation",
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single row was not accepted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("{field} = {value} is outside {expected}")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("{field} = {value:?} is not {expected}")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("{field} = {value:?} is not one of {allowed}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("{field} = {value} does not match any known {target}")]
    UnknownReference {
        field: &'static str,
        value: String,
        target: EntityKind,
    },

    #[error("duplicate {field} = {value}; first occurrence at row {first_row}")]
    DuplicateKey {
        field: &'static str,
        value: String,
        first_row: usize,
    },

    #[error("{field} = {value} already belongs to {target} {existing} in the warehouse")]
    ConflictingKey {
        field: &'static str,
        value: String,
        target: EntityKind,
        existing: String,
    },

    #[error("{later} ({later_value}) is before {earlier} ({earlier_value})")]
    DateOrder {
        earlier: &'static str,
        earlier_value: NaiveDate,
        later: &'static str,
        later_value: NaiveDate,
    },

    #[error("{field} ({value}) is after the run date {as_of}")]
    FutureDate {
        field: &'static str,
        value: NaiveDate,
        as_of: NaiveDate,
    },

    #[error(transparent)]
    Derivation(#[from] DerivationError),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

impl ValidationError {
    pub fn rule(&self) -> Rule {
        match self {
            ValidationError::Field(FieldError::Missing(_)) => Rule::MissingField,
            ValidationError::Field(FieldError::InvalidType { .. }) => Rule::InvalidType,
            ValidationError::OutOfRange { .. } => Rule::OutOfRange,
            ValidationError::InvalidFormat { .. } => Rule::InvalidFormat,
            ValidationError::InvalidEnum { .. } => Rule::InvalidEnum,
            ValidationError::UnknownReference { .. } => Rule::UnknownReference,
            ValidationError::DuplicateKey { .. } | ValidationError::ConflictingKey { .. } => {
                Rule::DuplicateKey
            }
            ValidationError::DateOrder { .. } => Rule::DateOrder,
            ValidationError::FutureDate { .. } => Rule::FutureDate,
            ValidationError::Derivation(_) => Rule::Derivation,
        }
    }
}

/// A rejected row with enough context to find and fix it at the source.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub entity: EntityKind,
    /// 1-based data row in the source file
    pub row: usize,
    pub rule: Rule,
    pub detail: String,
    /// The row as read
    pub raw: BTreeMap<String, String>,
}

impl Rejection {
    pub fn new(entity: EntityKind, raw: &RawRecord, error: &ValidationError) -> Self {
        Self {
            entity,
            row: raw.row,
            rule: error.rule(),
            detail: error.to_string(),
            raw: raw.values.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Rule::UnknownReference).unwrap(),
            "\"unknown_reference\""
        );
        assert_eq!(Rule::DuplicateKey.to_string(), "duplicate_key");
    }

    #[test]
    fn test_rejection_captures_row() {
        let raw = RawRecord::new(12, [("patient_id", "4"), ("age", "130")]);
        let error = ValidationError::OutOfRange {
            field: "age",
            value: "130".into(),
            expected: "0..=120".into(),
        };
        let rejection = Rejection::new(EntityKind::Patients, &raw, &error);

        assert_eq!(rejection.row, 12);
        assert_eq!(rejection.rule, Rule::OutOfRange);
        assert_eq!(rejection.detail, "age = 130 is outside 0..=120");
        assert_eq!(rejection.raw["age"], "130");
    }

    #[test]
    fn test_field_errors_map_to_rules() {
        assert_eq!(
            ValidationError::from(FieldError::Missing("cost")).rule(),
            Rule::MissingField
        );
        let zero = DerivationError::ZeroDivisor {
            field: "adherence_rate",
            divisor: "days_prescribed",
        };
        assert_eq!(ValidationError::from(zero).rule(), Rule::Derivation);
    }
}
