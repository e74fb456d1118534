//! Batch-addressed JSON Lines stage files.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{RunContext, Stage, StageError, StageResult, StagedRecord};
use crate::models::EntityKind;
use crate::validate::Rejection;

/// Directory under the Silver root holding rejection logs.
pub const REJECTIONS_DIR: &str = "_rejections";

/// Result of writing a stage file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// An identical file was already in place
    Unchanged,
}

/// Writes and reads the files of one stage.
pub struct StageWriter {
    root: PathBuf,
    stage: Stage,
}

impl StageWriter {
    pub fn new(root: impl Into<PathBuf>, stage: Stage) -> Self {
        Self {
            root: root.into(),
            stage,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<dir>/<batch_id>.jsonl`
    pub fn path_for(&self, dir: &str, batch_id: &str) -> PathBuf {
        self.root.join(dir).join(format!("{}.jsonl", batch_id))
    }

    /// Write the records of one entity for a batch.
    pub fn write<T: Serialize>(
        &self,
        entity: EntityKind,
        ctx: &RunContext,
        records: &[T],
    ) -> StageResult<WriteOutcome> {
        let path = self.path_for(entity.as_str(), &ctx.batch_id);
        let outcome = self.write_lines(&path, ctx, records)?;
        log::debug!(
            "{} {}: {} records {:?} at {}",
            self.stage,
            entity,
            records.len(),
            outcome,
            path.display()
        );
        Ok(outcome)
    }

    /// Read the records of one entity for a batch. A batch without a file
    /// for the entity reads as empty.
    pub fn read<T: DeserializeOwned>(
        &self,
        entity: EntityKind,
        batch_id: &str,
    ) -> StageResult<Vec<T>> {
        self.read_lines(&self.path_for(entity.as_str(), batch_id), batch_id)
    }

    /// Write the rejection log of a batch.
    pub fn write_rejections(
        &self,
        ctx: &RunContext,
        rejections: &[Rejection],
    ) -> StageResult<WriteOutcome> {
        let path = self.path_for(REJECTIONS_DIR, &ctx.batch_id);
        self.write_lines(&path, ctx, rejections)
    }

    pub fn read_rejections(&self, batch_id: &str) -> StageResult<Vec<Rejection>> {
        self.read_lines(&self.path_for(REJECTIONS_DIR, batch_id), batch_id)
    }

    fn write_lines<T: Serialize>(
        &self,
        path: &Path,
        ctx: &RunContext,
        records: &[T],
    ) -> StageResult<WriteOutcome> {
        let lineage = ctx.lineage(self.stage);
        let mut bytes = Vec::new();
        for record in records {
            let line = StagedRecord {
                lineage: lineage.clone(),
                record,
            };
            serde_json::to_writer(&mut bytes, &line)?;
            bytes.push(b'\n');
        }
        write_atomic(path, &bytes)
    }

    fn read_lines<T: DeserializeOwned>(&self, path: &Path, batch_id: &str) -> StageResult<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(path).map_err(|source| io_error(path, source))?;

        let mut records = Vec::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let staged: StagedRecord<T> =
                serde_json::from_str(line).map_err(|source| StageError::Json {
                    path: path.to_path_buf(),
                    line: index + 1,
                    source,
                })?;
            if staged.lineage.batch_id != batch_id {
                return Err(StageError::BatchMismatch {
                    path: path.to_path_buf(),
                    expected: batch_id.to_string(),
                    found: staged.lineage.batch_id,
                });
            }
            records.push(staged.record);
        }
        Ok(records)
    }
}

/// Replace `path` with `bytes` through a temporary file and rename, unless
/// the file already holds exactly these bytes.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StageResult<WriteOutcome> {
    if let Ok(existing) = fs::read(path) {
        if existing == bytes {
            return Ok(WriteOutcome::Unchanged);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
    }

    let tmp = path.with_extension("tmp");
    let mut file = File::create(&tmp).map_err(|source| io_error(&tmp, source))?;
    file.write_all(bytes)
        .and_then(|_| file.sync_all())
        .map_err(|source| io_error(&tmp, source))?;
    fs::rename(&tmp, path).map_err(|source| io_error(path, source))?;
    Ok(WriteOutcome::Written)
}

fn io_error(path: &Path, source: std::io::Error) -> StageError {
    StageError::Io {
        path: path.to_path_buf(),
        source,
    }
}
