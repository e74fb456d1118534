//! Load bookkeeping: which batches reached the warehouse.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{Database, DbResult};

/// A committed batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadBatch {
    pub batch_id: String,
    pub as_of: NaiveDate,
    /// Rows applied per table
    pub row_counts: BTreeMap<String, usize>,
    pub total_rows: usize,
    pub first_loaded_at: String,
    pub last_loaded_at: String,
    /// How many times the batch has been applied
    pub load_count: i64,
}

impl Database {
    /// Record a committed batch. Re-recording the same batch bumps its
    /// load count instead of adding a row.
    pub fn record_load_batch(
        &self,
        batch_id: &str,
        as_of: NaiveDate,
        row_counts: &BTreeMap<String, usize>,
    ) -> DbResult<()> {
        let counts_json = serde_json::to_string(row_counts)?;
        let total: usize = row_counts.values().sum();
        self.conn.execute(
            r#"
            INSERT INTO load_batches (batch_id, as_of, row_counts, total_rows)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(batch_id) DO UPDATE SET
                as_of = excluded.as_of,
                row_counts = excluded.row_counts,
                total_rows = excluded.total_rows,
                last_loaded_at = datetime('now'),
                load_count = load_count + 1
            "#,
            params![batch_id, as_of, counts_json, total as i64],
        )?;
        Ok(())
    }

    /// Get a committed batch by ID.
    pub fn get_load_batch(&self, batch_id: &str) -> DbResult<Option<LoadBatch>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT batch_id, as_of, row_counts, total_rows,
                       first_loaded_at, last_loaded_at, load_count
                FROM load_batches
                WHERE batch_id = ?
                "#,
                [batch_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, NaiveDate>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((batch_id, as_of, counts_json, total, first, last, load_count)) = row else {
            return Ok(None);
        };
        Ok(Some(LoadBatch {
            batch_id,
            as_of,
            row_counts: serde_json::from_str(&counts_json)?,
            total_rows: total as usize,
            first_loaded_at: first,
            last_loaded_at: last,
            load_count,
        }))
    }

    /// Number of batches recorded.
    pub fn load_batch_count(&self) -> DbResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM load_batches", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_batch_twice() {
        let db = Database::open_in_memory().unwrap();
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let counts = BTreeMap::from([("claims".to_string(), 3), ("patients".to_string(), 2)]);

        db.record_load_batch("b1", as_of, &counts).unwrap();
        db.record_load_batch("b1", as_of, &counts).unwrap();

        let batch = db.get_load_batch("b1").unwrap().unwrap();
        assert_eq!(batch.total_rows, 5);
        assert_eq!(batch.row_counts, counts);
        assert_eq!(batch.load_count, 2);
        assert_eq!(db.load_batch_count().unwrap(), 1);
        assert!(db.get_load_batch("b2").unwrap().is_none());
    }
}
