//! Prescription fact operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Prescription, PrescriptionAttributes, PrescriptionFeatures};

impl Database {
    /// Insert a prescription or fully overwrite the existing row.
    pub fn upsert_prescription(&self, prescription: &Prescription) -> DbResult<()> {
        let a = &prescription.attributes;
        let f = &prescription.features;
        self.conn.execute(
            r#"
            INSERT INTO prescriptions (
                prescription_id, patient_id, provider_id, medication_id, prescription_date,
                days_supplied, days_prescribed, quantity, cost,
                adherence_rate, adherence_category, cost_per_day,
                prescription_month, prescription_quarter, prescription_year, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                datetime('now')
            )
            ON CONFLICT(prescription_id) DO UPDATE SET
                patient_id = excluded.patient_id,
                provider_id = excluded.provider_id,
                medication_id = excluded.medication_id,
                prescription_date = excluded.prescription_date,
                days_supplied = excluded.days_supplied,
                days_prescribed = excluded.days_prescribed,
                quantity = excluded.quantity,
                cost = excluded.cost,
                adherence_rate = excluded.adherence_rate,
                adherence_category = excluded.adherence_category,
                cost_per_day = excluded.cost_per_day,
                prescription_month = excluded.prescription_month,
                prescription_quarter = excluded.prescription_quarter,
                prescription_year = excluded.prescription_year,
                updated_at = datetime('now')
            "#,
            params![
                a.prescription_id,
                a.patient_id,
                a.provider_id,
                a.medication_id,
                a.prescription_date,
                a.days_supplied,
                a.days_prescribed,
                a.quantity,
                a.cost,
                f.adherence_rate,
                f.adherence_category,
                f.cost_per_day,
                f.prescription_month,
                f.prescription_quarter,
                f.prescription_year,
            ],
        )?;
        Ok(())
    }

    /// Get a prescription by ID.
    pub fn get_prescription(&self, prescription_id: i64) -> DbResult<Option<Prescription>> {
        self.conn
            .query_row(
                r#"
                SELECT prescription_id, patient_id, provider_id, medication_id, prescription_date,
                       days_supplied, days_prescribed, quantity, cost,
                       adherence_rate, adherence_category, cost_per_day,
                       prescription_month, prescription_quarter, prescription_year
                FROM prescriptions
                WHERE prescription_id = ?
                "#,
                [prescription_id],
                |row| {
                    Ok(Prescription {
                        attributes: PrescriptionAttributes {
                            prescription_id: row.get(0)?,
                            patient_id: row.get(1)?,
                            provider_id: row.get(2)?,
                            medication_id: row.get(3)?,
                            prescription_date: row.get(4)?,
                            days_supplied: row.get(5)?,
                            days_prescribed: row.get(6)?,
                            quantity: row.get(7)?,
                            cost: row.get(8)?,
                        },
                        features: PrescriptionFeatures {
                            adherence_rate: row.get(9)?,
                            adherence_category: row.get(10)?,
                            cost_per_day: row.get(11)?,
                            prescription_month: row.get(12)?,
                            prescription_quarter: row.get(13)?,
                            prescription_year: row.get(14)?,
                        },
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }
}
