//! Columnar input schemas.
//!
//! Every input batch is described by (field name, primitive type,
//! nullability). Non-nullable columns must be present in the file header;
//! nullable columns may be omitted entirely.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::{EntityKind, RawRecord};

/// Primitive type of an input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Boolean,
    Date,
    Text,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Text => "text",
        })
    }
}

/// One column of an input schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
}

const fn required(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty, nullable: false }
}

const fn optional(name: &'static str, ty: FieldType) -> FieldSpec {
    FieldSpec { name, ty, nullable: true }
}

/// Batch-level schema failure. Fatal for the run.
#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error("{entity} input is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        entity: EntityKind,
        columns: Vec<String>,
    },
}

/// Row-level field failure, reported as a rejection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("missing required field `{0}`")]
    Missing(&'static str),

    #[error("field `{field}` expected {expected}, got {value:?}")]
    InvalidType {
        field: &'static str,
        expected: FieldType,
        value: String,
    },
}

/// A parsed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    Text(String),
}

/// A raw record after every cell has been parsed to its declared type.
/// Null cells are simply absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypedRow {
    values: BTreeMap<&'static str, Value>,
}

impl TypedRow {
    pub fn integer(&self, field: &str) -> Option<i64> {
        match self.values.get(field) {
            Some(Value::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, field: &str) -> Option<f64> {
        match self.values.get(field) {
            Some(Value::Float(v)) => Some(*v),
            Some(Value::Integer(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        match self.values.get(field) {
            Some(Value::Boolean(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn date(&self, field: &str) -> Option<NaiveDate> {
        match self.values.get(field) {
            Some(Value::Date(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        match self.values.get(field) {
            Some(Value::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Required integer; the schema guarantees presence for non-nullable fields.
    pub fn require_integer(&self, field: &'static str) -> Result<i64, FieldError> {
        self.integer(field).ok_or(FieldError::Missing(field))
    }

    pub fn require_float(&self, field: &'static str) -> Result<f64, FieldError> {
        self.float(field).ok_or(FieldError::Missing(field))
    }

    pub fn require_date(&self, field: &'static str) -> Result<NaiveDate, FieldError> {
        self.date(field).ok_or(FieldError::Missing(field))
    }

    pub fn require_text(&self, field: &'static str) -> Result<&str, FieldError> {
        self.text(field).ok_or(FieldError::Missing(field))
    }
}

/// Input schema of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSchema {
    pub entity: EntityKind,
    pub fields: &'static [FieldSpec],
}

use FieldType::*;

pub const PATIENTS: TableSchema = TableSchema {
    entity: EntityKind::Patients,
    fields: &[
        required("patient_id", Integer),
        required("age", Integer),
        optional("gender", Text),
        optional("race", Text),
        optional("zip_code", Text),
        optional("insurance_type", Text),
        optional("chronic_conditions", Integer),
        optional("last_visit_date", Date),
    ],
};

pub const PROVIDERS: TableSchema = TableSchema {
    entity: EntityKind::Providers,
    fields: &[
        required("provider_id", Integer),
        required("hospital_name", Text),
        optional("provider_type", Text),
        required("state", Text),
        optional("city", Text),
        required("beds", Integer),
        optional("teaching_hospital", Boolean),
    ],
};

pub const MEDICATIONS: TableSchema = TableSchema {
    entity: EntityKind::Medications,
    fields: &[
        required("medication_id", Integer),
        required("medication_name", Text),
        optional("medication_category", Text),
    ],
};

pub const DIAGNOSIS_CODES: TableSchema = TableSchema {
    entity: EntityKind::DiagnosisCodes,
    fields: &[
        required("diagnosis_code", Text),
        required("description", Text),
        optional("category", Text),
    ],
};

pub const CLAIMS: TableSchema = TableSchema {
    entity: EntityKind::Claims,
    fields: &[
        required("claim_id", Integer),
        required("patient_id", Integer),
        required("provider_id", Integer),
        optional("diagnosis_code", Text),
        optional("procedure_code", Text),
        required("admission_date", Date),
        optional("discharge_date", Date),
        optional("readmission_date", Date),
        required("cost", Float),
        optional("insurance_type", Text),
    ],
};

pub const PRESCRIPTIONS: TableSchema = TableSchema {
    entity: EntityKind::Prescriptions,
    fields: &[
        required("prescription_id", Integer),
        required("patient_id", Integer),
        required("provider_id", Integer),
        optional("medication_id", Integer),
        optional("medication_name", Text),
        required("prescription_date", Date),
        required("days_supplied", Integer),
        required("days_prescribed", Integer),
        required("quantity", Integer),
        required("cost", Float),
    ],
};

impl TableSchema {
    /// Schema for an entity.
    pub fn for_entity(entity: EntityKind) -> &'static TableSchema {
        match entity {
            EntityKind::Patients => &PATIENTS,
            EntityKind::Providers => &PROVIDERS,
            EntityKind::Medications => &MEDICATIONS,
            EntityKind::DiagnosisCodes => &DIAGNOSIS_CODES,
            EntityKind::Claims => &CLAIMS,
            EntityKind::Prescriptions => &PRESCRIPTIONS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check that every non-nullable column is present in a file header.
    /// Extra columns (including stale derived columns) are ignored.
    pub fn check_columns<S: AsRef<str>>(&self, headers: &[S]) -> Result<(), SchemaError> {
        let missing: Vec<String> = self
            .fields
            .iter()
            .filter(|f| !f.nullable)
            .filter(|f| !headers.iter().any(|h| h.as_ref().trim() == f.name))
            .map(|f| f.name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns {
                entity: self.entity,
                columns: missing,
            })
        }
    }

    /// Parse every declared field of a raw record, in declaration order,
    /// stopping at the first failure.
    pub fn parse(&self, raw: &RawRecord) -> Result<TypedRow, FieldError> {
        let mut row = TypedRow::default();
        for field in self.fields {
            match raw.get(field.name) {
                _ if raw.is_undecodable(field.name) => {
                    return Err(FieldError::InvalidType {
                        field: field.name,
                        expected: field.ty,
                        value: raw.values.get(field.name).cloned().unwrap_or_default(),
                    })
                }
                None if field.nullable => {}
                None => return Err(FieldError::Missing(field.name)),
                Some(text) => {
                    let value = parse_value(field.ty, text).ok_or_else(|| FieldError::InvalidType {
                        field: field.name,
                        expected: field.ty,
                        value: text.to_string(),
                    })?;
                    row.values.insert(field.name, value);
                }
            }
        }
        Ok(row)
    }
}

fn parse_value(ty: FieldType, text: &str) -> Option<Value> {
    match ty {
        FieldType::Integer => parse_integer(text).map(Value::Integer),
        FieldType::Float => text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Value::Float),
        FieldType::Boolean => parse_bool(text).map(Value::Boolean),
        FieldType::Date => parse_date(text).map(Value::Date),
        FieldType::Text => Some(Value::Text(text.to_string())),
    }
}

/// Integers, also accepting integral floats such as "42.0" from
/// spreadsheet exports.
fn parse_integer(text: &str) -> Option<i64> {
    if let Ok(v) = text.parse::<i64>() {
        return Some(v);
    }
    let v = text.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Calendar date in UTC. Timestamps with an offset are converted to UTC
/// before the date is taken; naive timestamps are read as UTC.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc().date());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_columns_reports_all_missing() {
        let err = CLAIMS
            .check_columns(&["claim_id", "patient_id", "cost"])
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumns {
                entity: EntityKind::Claims,
                columns: vec!["provider_id".into(), "admission_date".into()],
            }
        );
    }

    #[test]
    fn test_nullable_columns_may_be_absent() {
        assert!(PATIENTS.check_columns(&["patient_id", "age"]).is_ok());
    }

    #[test]
    fn test_parse_typed_row() {
        let raw = RawRecord::new(
            1,
            [
                ("claim_id", "10"),
                ("patient_id", "1"),
                ("provider_id", "2"),
                ("admission_date", "2024-01-01"),
                ("discharge_date", ""),
                ("cost", "1200.50"),
            ],
        );
        let row = CLAIMS.parse(&raw).unwrap();
        assert_eq!(row.integer("claim_id"), Some(10));
        assert_eq!(row.date("admission_date"), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(row.date("discharge_date"), None);
        assert_eq!(row.float("cost"), Some(1200.5));
    }

    #[test]
    fn test_parse_stops_at_first_bad_field() {
        let raw = RawRecord::new(3, [("patient_id", "abc"), ("age", "old")]);
        let err = PATIENTS.parse(&raw).unwrap_err();
        assert_eq!(
            err,
            FieldError::InvalidType {
                field: "patient_id",
                expected: FieldType::Integer,
                value: "abc".into(),
            }
        );
    }

    #[test]
    fn test_missing_required_value() {
        let raw = RawRecord::new(3, [("patient_id", "5"), ("age", " ")]);
        assert_eq!(PATIENTS.parse(&raw).unwrap_err(), FieldError::Missing("age"));
    }

    #[test]
    fn test_integer_accepts_integral_float() {
        assert_eq!(parse_integer("42.0"), Some(42));
        assert_eq!(parse_integer("42.5"), None);
        assert_eq!(parse_integer("NaN"), None);
    }

    #[test]
    fn test_date_formats_use_utc() {
        let jan2 = NaiveDate::from_ymd_opt(2024, 1, 2);
        assert_eq!(parse_date("2024-01-02"), jan2);
        assert_eq!(parse_date("2024-01-02 13:45:00"), jan2);
        // 23:30 at UTC-05:00 is already the next day in UTC
        assert_eq!(parse_date("2024-01-01T23:30:00-05:00"), jan2);
        assert_eq!(parse_date("01/02/2024"), None);
    }

    #[test]
    fn test_bool_tokens() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
