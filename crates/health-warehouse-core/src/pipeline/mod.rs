//! Pipeline orchestration.
//!
//! ```text
//! source CSVs ──extract──▶ Bronze ──transform──▶ Silver ──promote──▶ Gold ──load──▶ warehouse
//!                                        │                        │
//!                                        └─ rejections            └─ manifest
//! ```
//!
//! Each step reads what the previous step staged, so steps can run
//! separately (as the CLI does) or together through [`Pipeline::run`].

mod transform;

pub use transform::*;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commit::{CommitError, CommitReport, Committer};
use crate::config::{ConfigError, PipelineConfig};
use crate::db::{Database, DbError};
use crate::ingest::{read_source_dir, IngestError};
use crate::models::{CuratedBatch, EntityKind, GoldBatch, RawRecord};
use crate::stage::{
    write_atomic, RunContext, RunManifest, Stage, StageError, StageWriter, WriteOutcome,
};
use crate::validate::KnownKeys;

/// Pipeline errors. Each fails the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Stage error: {0}")]
    Stage(#[from] StageError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Commit error: {0}")]
    Commit(#[from] CommitError),

    #[error("batch {batch_id} has not been {step}")]
    MissingBatch { batch_id: String, step: &'static str },

    #[error("{entity} {id}: {column} = {value} no longer resolves; re-run transform")]
    Inconsistent {
        entity: EntityKind,
        id: String,
        column: &'static str,
        value: String,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Directory under the Bronze root holding per-batch extract records.
pub const BATCHES_DIR: &str = "_batches";

/// What extract staged for a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchInfo {
    pub batch_id: String,
    pub as_of: NaiveDate,
    /// SHA-256 of the raw input, hex encoded
    pub source_digest: String,
    /// Rows read per table
    pub rows: BTreeMap<String, usize>,
}

impl BatchInfo {
    pub fn context(&self) -> RunContext {
        RunContext {
            batch_id: self.batch_id.clone(),
            as_of: self.as_of,
        }
    }
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub manifest: RunManifest,
    pub commit: CommitReport,
}

/// Runs batches through the stages with one configuration.
pub struct Pipeline {
    config: PipelineConfig,
    bronze: StageWriter,
    silver: StageWriter,
    gold: StageWriter,
}

impl Pipeline {
    /// Create a pipeline. The configuration is validated first; an invalid
    /// one never starts a run.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            bronze: StageWriter::new(&config.paths.bronze_path, Stage::Bronze),
            silver: StageWriter::new(&config.paths.silver_path, Stage::Silver),
            gold: StageWriter::new(&config.paths.gold_path, Stage::Gold),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Open the configured warehouse database.
    pub fn open_database(&self) -> PipelineResult<Database> {
        let path = &self.config.paths.database_path;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(Database::open(path)?)
    }

    /// Read the source directory and stage its rows in Bronze.
    pub fn extract(&self, source_dir: &Path, as_of: NaiveDate) -> PipelineResult<BatchInfo> {
        let source = read_source_dir(source_dir)?;
        let ctx = RunContext::for_digest(&source.digest, as_of);
        log::info!("Extracting batch {} from {}", ctx.batch_id, source_dir.display());

        let mut rows = BTreeMap::new();
        for table in &source.tables {
            self.bronze.write(table.entity, &ctx, &table.rows)?;
            rows.insert(table.entity.as_str().to_string(), table.rows.len());
        }

        let info = BatchInfo {
            batch_id: ctx.batch_id.clone(),
            as_of,
            source_digest: source.digest_hex(),
            rows,
        };
        write_json(&self.batch_info_path(&ctx.batch_id), &info)?;
        Ok(info)
    }

    /// Validate and derive a Bronze batch into Silver, then promote it to
    /// Gold and write the run manifest.
    pub fn transform(&self, batch_id: &str, db: &Database) -> PipelineResult<RunManifest> {
        let info = self.batch_info(batch_id)?;
        let ctx = info.context();

        let mut raw = RawBatch::new();
        for entity in EntityKind::ALL {
            raw.insert(entity, self.bronze.read::<RawRecord>(entity, batch_id)?);
        }

        let transformed = transform_batch(&self.config, ctx.as_of, &raw, db.known_keys()?);
        write_batch(&self.silver, &ctx, &transformed.records)?;
        self.silver.write_rejections(&ctx, &transformed.rejections)?;

        self.promote(&ctx, db)?;

        let manifest = RunManifest::summarize(
            &ctx,
            info.source_digest.clone(),
            self.config.fingerprint()?,
            &transformed.read,
            &transformed.accepted(),
            &transformed.rejections,
        );
        manifest.write_to_file(&self.manifest_path(batch_id))?;
        log::info!(
            "Batch {}: {} accepted, {} rejected ({:?})",
            batch_id,
            manifest.total_accepted(),
            manifest.total_rejected(),
            manifest.status
        );
        Ok(manifest)
    }

    /// Copy a Silver batch to Gold after checking that every fact
    /// reference resolves against the warehouse plus the batch itself.
    pub fn promote(&self, ctx: &RunContext, db: &Database) -> PipelineResult<()> {
        let records = read_batch(&self.silver, &ctx.batch_id)?;

        let mut keys = db.known_keys()?;
        keys.extend_from_batch(&records);
        verify_references(&records, &keys)?;

        write_batch(&self.gold, ctx, &records)?;
        Ok(())
    }

    /// Commit a Gold batch to the warehouse.
    pub fn load(&self, batch_id: &str, db: &Database) -> PipelineResult<CommitReport> {
        let manifest_path = self.manifest_path(batch_id);
        if !manifest_path.exists() {
            return Err(PipelineError::MissingBatch {
                batch_id: batch_id.to_string(),
                step: "transformed",
            });
        }
        let manifest = RunManifest::read_from_file(&manifest_path)?;

        let batch = GoldBatch {
            batch_id: batch_id.to_string(),
            as_of: manifest.as_of,
            records: read_batch(&self.gold, batch_id)?,
        };
        Ok(Committer::new(db).commit(&batch)?)
    }

    /// Extract, transform and load one source directory.
    pub fn run(&self, source_dir: &Path, as_of: NaiveDate, db: &Database) -> PipelineResult<RunSummary> {
        let info = self.extract(source_dir, as_of)?;
        let manifest = self.transform(&info.batch_id, db)?;
        let commit = self.load(&info.batch_id, db)?;
        Ok(RunSummary { manifest, commit })
    }

    /// The extract record of a batch.
    pub fn batch_info(&self, batch_id: &str) -> PipelineResult<BatchInfo> {
        let path = self.batch_info_path(batch_id);
        if !path.exists() {
            return Err(PipelineError::MissingBatch {
                batch_id: batch_id.to_string(),
                step: "extracted",
            });
        }
        read_json(&path)
    }

    pub fn manifest_path(&self, batch_id: &str) -> PathBuf {
        RunManifest::path_for(&self.config.paths.gold_path, batch_id)
    }

    fn batch_info_path(&self, batch_id: &str) -> PathBuf {
        self.config
            .paths
            .bronze_path
            .join(BATCHES_DIR)
            .join(format!("{}.json", batch_id))
    }
}

fn write_batch(
    writer: &StageWriter,
    ctx: &RunContext,
    records: &CuratedBatch,
) -> PipelineResult<WriteOutcome> {
    let outcomes = [
        writer.write(EntityKind::Patients, ctx, &records.patients)?,
        writer.write(EntityKind::Providers, ctx, &records.providers)?,
        writer.write(EntityKind::Medications, ctx, &records.medications)?,
        writer.write(EntityKind::DiagnosisCodes, ctx, &records.diagnosis_codes)?,
        writer.write(EntityKind::Claims, ctx, &records.claims)?,
        writer.write(EntityKind::Prescriptions, ctx, &records.prescriptions)?,
    ];
    let outcome = if outcomes.contains(&WriteOutcome::Written) {
        WriteOutcome::Written
    } else {
        WriteOutcome::Unchanged
    };
    log::info!("{} stage for batch {}: {:?}", writer.stage(), ctx.batch_id, outcome);
    Ok(outcome)
}

fn read_batch(reader: &StageWriter, batch_id: &str) -> PipelineResult<CuratedBatch> {
    Ok(CuratedBatch {
        patients: reader.read(EntityKind::Patients, batch_id)?,
        providers: reader.read(EntityKind::Providers, batch_id)?,
        medications: reader.read(EntityKind::Medications, batch_id)?,
        diagnosis_codes: reader.read(EntityKind::DiagnosisCodes, batch_id)?,
        claims: reader.read(EntityKind::Claims, batch_id)?,
        prescriptions: reader.read(EntityKind::Prescriptions, batch_id)?,
    })
}

/// Every non-null fact reference must resolve.
pub fn verify_references(records: &CuratedBatch, keys: &KnownKeys) -> PipelineResult<()> {
    let broken = |entity, id: i64, column, value: String| PipelineError::Inconsistent {
        entity,
        id: id.to_string(),
        column,
        value,
    };

    for claim in &records.claims {
        let a = &claim.attributes;
        if !keys.patients.contains(&a.patient_id) {
            return Err(broken(EntityKind::Claims, a.claim_id, "patient_id", a.patient_id.to_string()));
        }
        if !keys.providers.contains(&a.provider_id) {
            return Err(broken(EntityKind::Claims, a.claim_id, "provider_id", a.provider_id.to_string()));
        }
        if let Some(code) = &a.diagnosis_code {
            if !keys.diagnosis_codes.contains(code) {
                return Err(broken(EntityKind::Claims, a.claim_id, "diagnosis_code", code.clone()));
            }
        }
    }

    for prescription in &records.prescriptions {
        let a = &prescription.attributes;
        let id = a.prescription_id;
        if !keys.patients.contains(&a.patient_id) {
            return Err(broken(EntityKind::Prescriptions, id, "patient_id", a.patient_id.to_string()));
        }
        if !keys.providers.contains(&a.provider_id) {
            return Err(broken(EntityKind::Prescriptions, id, "provider_id", a.provider_id.to_string()));
        }
        if let Some(medication_id) = a.medication_id {
            if !keys.medications.contains(&medication_id) {
                return Err(broken(
                    EntityKind::Prescriptions,
                    id,
                    "medication_id",
                    medication_id.to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> PipelineResult<WriteOutcome> {
    let mut json = serde_json::to_string_pretty(value).map_err(StageError::from)?;
    json.push('\n');
    Ok(write_atomic(path, json.as_bytes())?)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> PipelineResult<T> {
    let json = fs::read_to_string(path).map_err(|source| StageError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&json).map_err(StageError::from)?)
}
