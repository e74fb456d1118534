//! Read-side queries: provider metrics, row counts, quality probes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Database, DbResult};
use crate::models::EntityKind;

/// One row of the `provider_metrics` view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderMetrics {
    pub provider_id: i64,
    pub hospital_name: String,
    pub provider_type: String,
    pub state: String,
    pub hospital_size: String,
    pub claim_count: i64,
    /// `None` for providers without claims
    pub avg_cost: Option<f64>,
    /// Share of claims flagged as readmissions
    pub readmission_rate: Option<f64>,
    /// Distinct patients with a claim at this provider
    pub patient_volume: i64,
}

impl Database {
    /// Aggregates for every provider, projected from claims at read time.
    pub fn provider_metrics(&self) -> DbResult<Vec<ProviderMetrics>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT provider_id, hospital_name, provider_type, state, hospital_size,
                   claim_count, avg_cost, readmission_rate, patient_volume
            FROM provider_metrics
            ORDER BY provider_id
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ProviderMetrics {
                provider_id: row.get(0)?,
                hospital_name: row.get(1)?,
                provider_type: row.get(2)?,
                state: row.get(3)?,
                hospital_size: row.get(4)?,
                claim_count: row.get(5)?,
                avg_cost: row.get(6)?,
                readmission_rate: row.get(7)?,
                patient_volume: row.get(8)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Row count of one warehouse table.
    pub fn count_rows(&self, entity: EntityKind) -> DbResult<i64> {
        // Table names come from a closed enum, never from input.
        let sql = format!("SELECT COUNT(*) FROM {}", entity.as_str());
        let count = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    /// Row counts of every warehouse table, keyed by table name.
    pub fn table_counts(&self) -> DbResult<BTreeMap<String, i64>> {
        EntityKind::ALL
            .iter()
            .map(|entity| Ok((entity.as_str().to_string(), self.count_rows(*entity)?)))
            .collect()
    }

    /// Run a `SELECT COUNT(*)` probe and return the count.
    pub fn count_violations(&self, probe: &str) -> DbResult<i64> {
        let count = self.conn.query_row(probe, [], |row| row.get(0))?;
        Ok(count)
    }
}
