//! Warehouse database layer.

mod analytics;
mod batches;
mod claims;
mod patients;
mod prescriptions;
mod providers;
mod reference;
mod schema;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use analytics::*;
pub use batches::*;
pub use schema::*;

use rusqlite::{Connection, Transaction};
use std::path::Path;
use thiserror::Error;

use crate::validate::KnownKeys;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a transaction. Every statement issued through this database
    /// until the transaction is committed or dropped is part of it; dropping
    /// without commit rolls back.
    pub fn begin(&self) -> DbResult<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    /// Keys of every dimension row in the warehouse.
    pub fn known_keys(&self) -> DbResult<KnownKeys> {
        let mut keys = KnownKeys::new();
        keys.patients = self.query_column::<i64, _>("SELECT patient_id FROM patients")?;
        keys.providers = self.query_column::<i64, _>("SELECT provider_id FROM providers")?;
        keys.diagnosis_codes = self.query_column::<String, _>("SELECT diagnosis_code FROM diagnosis_codes")?;

        let mut stmt = self
            .conn
            .prepare("SELECT medication_id, medication_name FROM medications")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (id, name) = row?;
            keys.add_medication(id, &name);
        }
        Ok(keys)
    }

    fn query_column<T, C>(&self, sql: &str) -> DbResult<C>
    where
        T: rusqlite::types::FromSql,
        C: FromIterator<T>,
    {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, T>(0))?;
        rows.collect::<Result<C, _>>().map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "patients",
            "providers",
            "medications",
            "diagnosis_codes",
            "claims",
            "prescriptions",
            "load_batches",
        ] {
            assert!(tables.contains(&table.to_string()), "missing table {}", table);
        }

        let views: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='view' AND name='provider_metrics'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(views, 1);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warehouse.db");
        Database::open(&path).unwrap();
        assert!(Database::open(&path).is_ok());
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let db = Database::open_in_memory().unwrap();
        {
            let _tx = db.begin().unwrap();
            db.conn()
                .execute(
                    "INSERT INTO diagnosis_codes (diagnosis_code, description) VALUES ('E11.9', 'x')",
                    [],
                )
                .unwrap();
        }
        assert!(db.known_keys().unwrap().diagnosis_codes.is_empty());
    }
}
