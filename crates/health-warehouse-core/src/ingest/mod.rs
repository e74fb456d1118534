//! Source file ingest: CSV files into raw records.

mod schema;

pub use schema::*;

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{EntityKind, RawRecord};

/// Ingest errors. All are fatal for the run.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Raw rows of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub entity: EntityKind,
    /// `None` when the batch had no file for this entity
    pub path: Option<PathBuf>,
    pub rows: Vec<RawRecord>,
}

/// Raw rows of every entity plus the digest of the bytes they came from.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub tables: Vec<SourceTable>,
    /// SHA-256 over every entity name and file content, in load order
    pub digest: [u8; 32],
}

impl SourceBatch {
    pub fn table(&self, entity: EntityKind) -> Option<&SourceTable> {
        self.tables.iter().find(|t| t.entity == entity)
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

/// Input file for an entity inside a source directory: `<dir>/<entity>.csv`.
pub fn source_path(dir: &Path, entity: EntityKind) -> PathBuf {
    dir.join(format!("{}.csv", entity.as_str()))
}

/// Read every entity file from a directory. Absent files are empty tables.
pub fn read_source_dir(dir: &Path) -> IngestResult<SourceBatch> {
    let mut hasher = Sha256::new();
    let mut tables = Vec::with_capacity(EntityKind::ALL.len());

    for entity in EntityKind::ALL {
        let path = source_path(dir, entity);
        hasher.update(entity.as_str().as_bytes());
        hasher.update([0u8]);

        if !path.exists() {
            log::warn!("No {} input at {}; treating as empty", entity, path.display());
            hasher.update([0u8]);
            tables.push(SourceTable {
                entity,
                path: None,
                rows: Vec::new(),
            });
            continue;
        }

        let bytes = fs::read(&path).map_err(|source| IngestError::Io {
            path: path.clone(),
            source,
        })?;
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(&bytes);

        let rows = parse_csv(entity, &path, &bytes)?;
        log::info!("Read {} {} rows from {}", rows.len(), entity, path.display());
        tables.push(SourceTable {
            entity,
            path: Some(path),
            rows,
        });
    }

    Ok(SourceBatch {
        tables,
        digest: hasher.finalize().into(),
    })
}

/// Parse CSV bytes into raw records after checking the header against the
/// entity's schema.
pub fn parse_csv(entity: EntityKind, path: &Path, bytes: &[u8]) -> IngestResult<Vec<RawRecord>> {
    let csv_error = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    TableSchema::for_entity(entity).check_columns(&headers)?;

    // Cells are decoded one by one so a bad cell rejects its row only.
    let mut rows = Vec::new();
    for (index, record) in reader.byte_records().enumerate() {
        let record = record.map_err(csv_error)?;
        let mut raw = RawRecord::new(index + 1, std::iter::empty::<(String, String)>());
        for (header, cell) in headers.iter().zip(record.iter()) {
            let text = match std::str::from_utf8(cell) {
                Ok(text) => text.to_string(),
                Err(_) => {
                    raw.undecodable.insert(header.clone());
                    String::from_utf8_lossy(cell).into_owned()
                }
            };
            raw.values.insert(header.clone(), text);
        }
        if !raw.undecodable.is_empty() {
            log::warn!(
                "{} row {}: undecodable bytes in {:?}",
                entity,
                raw.row,
                raw.undecodable
            );
        }
        rows.push(raw);
    }
    Ok(rows)
}
