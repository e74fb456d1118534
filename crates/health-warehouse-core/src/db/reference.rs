//! Medication and diagnosis code reference data.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{DiagnosisCode, Medication};

impl Database {
    /// Insert or update a medication.
    pub fn upsert_medication(&self, medication: &Medication) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO medications (medication_id, medication_name, medication_category, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(medication_id) DO UPDATE SET
                medication_name = excluded.medication_name,
                medication_category = excluded.medication_category,
                updated_at = datetime('now')
            "#,
            params![
                medication.medication_id,
                medication.medication_name,
                medication.medication_category,
            ],
        )?;
        Ok(())
    }

    /// Get a medication by ID.
    pub fn get_medication(&self, medication_id: i64) -> DbResult<Option<Medication>> {
        self.conn
            .query_row(
                r#"
                SELECT medication_id, medication_name, medication_category
                FROM medications
                WHERE medication_id = ?
                "#,
                [medication_id],
                medication_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Find a medication by name, ignoring case.
    pub fn find_medication_by_name(&self, name: &str) -> DbResult<Option<Medication>> {
        self.conn
            .query_row(
                r#"
                SELECT medication_id, medication_name, medication_category
                FROM medications
                WHERE medication_name = ? COLLATE NOCASE
                "#,
                [name.trim()],
                medication_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert or update a diagnosis code. The code must already be in
    /// canonical form.
    pub fn upsert_diagnosis_code(&self, code: &DiagnosisCode) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO diagnosis_codes (diagnosis_code, description, category, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(diagnosis_code) DO UPDATE SET
                description = excluded.description,
                category = excluded.category,
                updated_at = datetime('now')
            "#,
            params![code.diagnosis_code, code.description, code.category],
        )?;
        Ok(())
    }

    /// Get a diagnosis code by its canonical form.
    pub fn get_diagnosis_code(&self, diagnosis_code: &str) -> DbResult<Option<DiagnosisCode>> {
        self.conn
            .query_row(
                r#"
                SELECT diagnosis_code, description, category
                FROM diagnosis_codes
                WHERE diagnosis_code = ?
                "#,
                [diagnosis_code],
                |row| {
                    Ok(DiagnosisCode {
                        diagnosis_code: row.get(0)?,
                        description: row.get(1)?,
                        category: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}

fn medication_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Medication> {
    Ok(Medication {
        medication_id: row.get(0)?,
        medication_name: row.get(1)?,
        medication_category: row.get(2)?,
    })
}
