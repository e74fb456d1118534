//! Claim fact operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Claim, ClaimAttributes, ClaimFeatures};

const CLAIM_COLUMNS: &str = r#"
    claim_id, patient_id, provider_id, diagnosis_code, procedure_code,
    admission_date, discharge_date, readmission_date, cost, insurance_type,
    readmission_flag, length_of_stay, cost_per_day, cost_category, los_category,
    admission_month, admission_quarter, admission_year, admission_day_of_week
"#;

impl Database {
    /// Insert a claim or fully overwrite the existing row with the same ID.
    pub fn upsert_claim(&self, claim: &Claim) -> DbResult<()> {
        let a = &claim.attributes;
        let f = &claim.features;
        self.conn.execute(
            r#"
            INSERT INTO claims (
                claim_id, patient_id, provider_id, diagnosis_code, procedure_code,
                admission_date, discharge_date, readmission_date, cost, insurance_type,
                readmission_flag, length_of_stay, cost_per_day, cost_category, los_category,
                admission_month, admission_quarter, admission_year, admission_day_of_week,
                updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, datetime('now')
            )
            ON CONFLICT(claim_id) DO UPDATE SET
                patient_id = excluded.patient_id,
                provider_id = excluded.provider_id,
                diagnosis_code = excluded.diagnosis_code,
                procedure_code = excluded.procedure_code,
                admission_date = excluded.admission_date,
                discharge_date = excluded.discharge_date,
                readmission_date = excluded.readmission_date,
                cost = excluded.cost,
                insurance_type = excluded.insurance_type,
                readmission_flag = excluded.readmission_flag,
                length_of_stay = excluded.length_of_stay,
                cost_per_day = excluded.cost_per_day,
                cost_category = excluded.cost_category,
                los_category = excluded.los_category,
                admission_month = excluded.admission_month,
                admission_quarter = excluded.admission_quarter,
                admission_year = excluded.admission_year,
                admission_day_of_week = excluded.admission_day_of_week,
                updated_at = datetime('now')
            "#,
            params![
                a.claim_id,
                a.patient_id,
                a.provider_id,
                a.diagnosis_code,
                a.procedure_code,
                a.admission_date,
                a.discharge_date,
                a.readmission_date,
                a.cost,
                a.insurance_type,
                f.readmission_flag,
                f.length_of_stay,
                f.cost_per_day,
                f.cost_category,
                f.los_category,
                f.admission_month,
                f.admission_quarter,
                f.admission_year,
                f.admission_day_of_week,
            ],
        )?;
        Ok(())
    }

    /// Get a claim by ID.
    pub fn get_claim(&self, claim_id: i64) -> DbResult<Option<Claim>> {
        let sql = format!("SELECT {} FROM claims WHERE claim_id = ?", CLAIM_COLUMNS);
        self.conn
            .query_row(&sql, [claim_id], claim_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// All claims of a patient, oldest admission first.
    pub fn list_claims_for_patient(&self, patient_id: i64) -> DbResult<Vec<Claim>> {
        let sql = format!(
            "SELECT {} FROM claims WHERE patient_id = ? ORDER BY admission_date, claim_id",
            CLAIM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([patient_id], claim_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn claim_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Claim> {
    Ok(Claim {
        attributes: ClaimAttributes {
            claim_id: row.get(0)?,
            patient_id: row.get(1)?,
            provider_id: row.get(2)?,
            diagnosis_code: row.get(3)?,
            procedure_code: row.get(4)?,
            admission_date: row.get(5)?,
            discharge_date: row.get(6)?,
            readmission_date: row.get(7)?,
            cost: row.get(8)?,
            insurance_type: row.get(9)?,
        },
        features: ClaimFeatures {
            readmission_flag: row.get(10)?,
            length_of_stay: row.get(11)?,
            cost_per_day: row.get(12)?,
            cost_category: row.get(13)?,
            los_category: row.get(14)?,
            admission_month: row.get(15)?,
            admission_quarter: row.get(16)?,
            admission_year: row.get(17)?,
            admission_day_of_week: row.get(18)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_fixtures::{claim, seed_dimensions};

    #[test]
    fn test_upsert_and_get_claim() {
        let db = Database::open_in_memory().unwrap();
        seed_dimensions(&db);

        let c = claim(500, 1, 10);
        db.upsert_claim(&c).unwrap();
        assert_eq!(db.get_claim(500).unwrap(), Some(c));
    }

    #[test]
    fn test_upsert_claim_full_overwrite() {
        let db = Database::open_in_memory().unwrap();
        seed_dimensions(&db);
        db.upsert_claim(&claim(500, 1, 10)).unwrap();

        let mut open = claim(500, 1, 10);
        open.attributes.discharge_date = None;
        open.features.length_of_stay = None;
        open.features.cost_per_day = None;
        open.features.los_category = None;
        open.features.readmission_flag = false;
        db.upsert_claim(&open).unwrap();

        let fetched = db.get_claim(500).unwrap().unwrap();
        assert_eq!(fetched, open);
        assert_eq!(db.list_claims_for_patient(1).unwrap().len(), 1);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = Database::open_in_memory().unwrap();
        seed_dimensions(&db);
        assert!(db.upsert_claim(&claim(501, 99, 10)).is_err());
    }
}
