//! Provider dimension operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbError, DbResult};
use crate::models::{HospitalSize, Provider, ProviderAttributes, ProviderFeatures, ProviderType};

impl Database {
    /// Insert or update a provider.
    pub fn upsert_provider(&self, provider: &Provider) -> DbResult<()> {
        let a = &provider.attributes;
        let f = &provider.features;
        self.conn.execute(
            r#"
            INSERT INTO providers (
                provider_id, hospital_name, provider_type, state, city, beds,
                teaching_hospital, hospital_size, full_address, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, datetime('now'))
            ON CONFLICT(provider_id) DO UPDATE SET
                hospital_name = excluded.hospital_name,
                provider_type = excluded.provider_type,
                state = excluded.state,
                city = excluded.city,
                beds = excluded.beds,
                teaching_hospital = excluded.teaching_hospital,
                hospital_size = excluded.hospital_size,
                full_address = excluded.full_address,
                updated_at = datetime('now')
            "#,
            params![
                a.provider_id,
                a.hospital_name,
                a.provider_type.as_str(),
                a.state,
                a.city,
                a.beds,
                a.teaching_hospital,
                f.hospital_size.as_str(),
                f.full_address,
            ],
        )?;
        Ok(())
    }

    /// Get a provider by ID.
    pub fn get_provider(&self, provider_id: i64) -> DbResult<Option<Provider>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT provider_id, hospital_name, provider_type, state, city, beds,
                       teaching_hospital, hospital_size, full_address
                FROM providers
                WHERE provider_id = ?
                "#,
                [provider_id],
                |row| {
                    Ok(ProviderRow {
                        provider_id: row.get(0)?,
                        hospital_name: row.get(1)?,
                        provider_type: row.get(2)?,
                        state: row.get(3)?,
                        city: row.get(4)?,
                        beds: row.get(5)?,
                        teaching_hospital: row.get(6)?,
                        hospital_size: row.get(7)?,
                        full_address: row.get(8)?,
                    })
                },
            )
            .optional()?;

        row.map(Provider::try_from).transpose()
    }
}

/// Intermediate row struct for database mapping.
struct ProviderRow {
    provider_id: i64,
    hospital_name: String,
    provider_type: String,
    state: String,
    city: String,
    beds: i64,
    teaching_hospital: bool,
    hospital_size: String,
    full_address: String,
}

impl TryFrom<ProviderRow> for Provider {
    type Error = DbError;

    fn try_from(row: ProviderRow) -> Result<Self, Self::Error> {
        let provider_type = ProviderType::from_str(&row.provider_type).ok_or_else(|| {
            DbError::Constraint(format!("Unknown provider type: {}", row.provider_type))
        })?;
        let hospital_size = HospitalSize::from_label(&row.hospital_size).ok_or_else(|| {
            DbError::Constraint(format!("Unknown hospital size: {}", row.hospital_size))
        })?;

        Ok(Provider {
            attributes: ProviderAttributes {
                provider_id: row.provider_id,
                hospital_name: row.hospital_name,
                provider_type,
                state: row.state,
                city: row.city,
                beds: row.beds,
                teaching_hospital: row.teaching_hospital,
            },
            features: ProviderFeatures {
                hospital_size,
                full_address: row.full_address,
            },
        })
    }
}
