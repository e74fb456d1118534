//! Stage storage: Bronze → Silver → Gold.
//!
//! Every stage file is JSON Lines addressed by batch id:
//!
//! ```text
//! <stage_root>/<entity>/<batch_id>.jsonl
//! <silver_root>/_rejections/<batch_id>.jsonl
//! <gold_root>/_manifests/<batch_id>.json
//! ```
//!
//! Each line is a [`StagedRecord`]: the record plus its lineage. Nothing in
//! a stage file depends on the wall clock, so re-running a batch produces
//! identical bytes and the writer leaves the existing files untouched.

mod manifest;
mod writer;

pub use manifest::*;
pub use writer::*;

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stage I/O errors. Fatal for the run.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("stage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed stage record in {path} line {line}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("{path} belongs to batch {found}, expected {expected}")]
    BatchMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[error("failed to serialize stage record: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StageResult<T> = Result<T, StageError>;

/// Medallion stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Rows as read from the source files
    Bronze,
    /// Validated and derived records, plus the rejection log
    Silver,
    /// Referentially consistent batch handed to the committer
    Gold,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Bronze => "bronze",
            Stage::Silver => "silver",
            Stage::Gold => "gold",
        }
    }

    /// The stage this one is built from; `None` for Bronze.
    pub fn source(&self) -> Option<Stage> {
        match self {
            Stage::Bronze => None,
            Stage::Silver => Some(Stage::Bronze),
            Stage::Gold => Some(Stage::Silver),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a staged record came from and when it was processed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lineage {
    pub batch_id: String,
    pub stage: Stage,
    pub source_stage: Option<Stage>,
    /// Logical processing time of the run (RFC 3339)
    pub processed_at: String,
}

/// One line of a stage file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StagedRecord<T> {
    pub lineage: Lineage,
    pub record: T,
}

/// Identity and logical time of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub batch_id: String,
    pub as_of: NaiveDate,
}

impl RunContext {
    /// Context for a batch identified by the SHA-256 of its input.
    pub fn for_digest(digest: &[u8; 32], as_of: NaiveDate) -> Self {
        Self {
            batch_id: batch_id_for(digest),
            as_of,
        }
    }

    /// Midnight UTC of the as-of date.
    pub fn processed_at(&self) -> String {
        format!("{}T00:00:00Z", self.as_of.format("%Y-%m-%d"))
    }

    pub fn lineage(&self, stage: Stage) -> Lineage {
        Lineage {
            batch_id: self.batch_id.clone(),
            stage,
            source_stage: stage.source(),
            processed_at: self.processed_at(),
        }
    }
}

/// Name-based (v5) UUID over the input digest: the same bytes always get
/// the same batch id.
pub fn batch_id_for(digest: &[u8; 32]) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, digest).to_string()
}
