//! Patient dimension operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{Gender, Patient, PatientAttributes, PatientFeatures};

impl Database {
    /// Insert or update a patient, recomputed features included.
    pub fn upsert_patient(&self, patient: &Patient) -> DbResult<()> {
        let a = &patient.attributes;
        let f = &patient.features;
        self.conn.execute(
            r#"
            INSERT INTO patients (
                patient_id, age, gender, race, zip_code, insurance_type,
                chronic_conditions, last_visit_date, age_category, risk_level,
                days_since_last_visit, patient_status, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'))
            ON CONFLICT(patient_id) DO UPDATE SET
                age = excluded.age,
                gender = excluded.gender,
                race = excluded.race,
                zip_code = excluded.zip_code,
                insurance_type = excluded.insurance_type,
                chronic_conditions = excluded.chronic_conditions,
                last_visit_date = excluded.last_visit_date,
                age_category = excluded.age_category,
                risk_level = excluded.risk_level,
                days_since_last_visit = excluded.days_since_last_visit,
                patient_status = excluded.patient_status,
                updated_at = datetime('now')
            "#,
            params![
                a.patient_id,
                a.age,
                a.gender.as_str(),
                a.race,
                a.zip_code,
                a.insurance_type,
                a.chronic_conditions,
                a.last_visit_date,
                f.age_category,
                f.risk_level,
                f.days_since_last_visit,
                f.patient_status,
            ],
        )?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: i64) -> DbResult<Option<Patient>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT patient_id, age, gender, race, zip_code, insurance_type,
                       chronic_conditions, last_visit_date, age_category, risk_level,
                       days_since_last_visit, patient_status
                FROM patients
                WHERE patient_id = ?
                "#,
                [patient_id],
                |row| {
                    Ok(PatientRow {
                        patient_id: row.get(0)?,
                        age: row.get(1)?,
                        gender: row.get(2)?,
                        race: row.get(3)?,
                        zip_code: row.get(4)?,
                        insurance_type: row.get(5)?,
                        chronic_conditions: row.get(6)?,
                        last_visit_date: row.get(7)?,
                        age_category: row.get(8)?,
                        risk_level: row.get(9)?,
                        days_since_last_visit: row.get(10)?,
                        patient_status: row.get(11)?,
                    })
                },
            )
            .optional()?;

        row.map(Patient::try_from).transpose()
    }
}

/// Intermediate row struct for database mapping.
struct PatientRow {
    patient_id: i64,
    age: i64,
    gender: String,
    race: String,
    zip_code: Option<String>,
    insurance_type: String,
    chronic_conditions: i64,
    last_visit_date: Option<NaiveDate>,
    age_category: String,
    risk_level: String,
    days_since_last_visit: Option<i64>,
    patient_status: Option<String>,
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = Gender::from_str(&row.gender)
            .ok_or_else(|| DbError::Constraint(format!("Unknown gender: {}", row.gender)))?;

        Ok(Patient {
            attributes: PatientAttributes {
                patient_id: row.patient_id,
                age: row.age,
                gender,
                race: row.race,
                zip_code: row.zip_code,
                insurance_type: row.insurance_type,
                chronic_conditions: row.chronic_conditions,
                last_visit_date: row.last_visit_date,
            },
            features: PatientFeatures {
                age_category: row.age_category,
                risk_level: row.risk_level,
                days_since_last_visit: row.days_since_last_visit,
                patient_status: row.patient_status,
            },
        })
    }
}
