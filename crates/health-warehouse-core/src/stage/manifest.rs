//! Run manifest.
//!
//! One per batch, written next to the Gold stage:
//!
//! ```json
//! {
//!   "batch_id": "5b0c6c1e-...",
//!   "as_of": "2024-06-30",
//!   "processed_at": "2024-06-30T00:00:00Z",
//!   "source_digest": "9f86d0...",
//!   "config_fingerprint": "2c26b4...",
//!   "status": "completed_with_rejections",
//!   "entities": {
//!     "claims": { "read": 1000, "accepted": 999, "rejected": 1,
//!                 "rejections_by_rule": { "unknown_reference": 1 } }
//!   },
//!   "format_version": 1
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{write_atomic, RunContext, StageError, StageResult, WriteOutcome};
use crate::models::EntityKind;
use crate::validate::Rejection;

/// Directory under the Gold root holding run manifests.
pub const MANIFESTS_DIR: &str = "_manifests";

/// Outcome of a run that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every row was accepted
    Clean,
    /// Some rows were rejected; the rest went through
    CompletedWithRejections,
}

/// Per-entity counts for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntitySummary {
    /// Rows read from the source
    pub read: usize,
    /// Rows that reached Gold
    pub accepted: usize,
    pub rejected: usize,
    /// Rejection count per rule name
    pub rejections_by_rule: BTreeMap<String, usize>,
}

impl EntitySummary {
    pub fn new(read: usize, accepted: usize, rejections: &[&Rejection]) -> Self {
        let mut rejections_by_rule = BTreeMap::new();
        for rejection in rejections {
            *rejections_by_rule
                .entry(rejection.rule.as_str().to_string())
                .or_insert(0) += 1;
        }
        Self {
            read,
            accepted,
            rejected: rejections.len(),
            rejections_by_rule,
        }
    }
}

/// Authoritative record of what one batch run produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunManifest {
    pub batch_id: String,
    pub as_of: NaiveDate,
    pub processed_at: String,
    /// SHA-256 of the raw input, hex encoded
    pub source_digest: String,
    /// SHA-256 of the validation and derivation rules
    pub config_fingerprint: String,
    pub status: RunStatus,
    /// Keyed by table name
    pub entities: BTreeMap<String, EntitySummary>,
    pub format_version: u8,
}

impl RunManifest {
    pub fn new(
        ctx: &RunContext,
        source_digest: impl Into<String>,
        config_fingerprint: impl Into<String>,
        entities: BTreeMap<String, EntitySummary>,
    ) -> Self {
        let status = if entities.values().any(|e| e.rejected > 0) {
            RunStatus::CompletedWithRejections
        } else {
            RunStatus::Clean
        };
        Self {
            batch_id: ctx.batch_id.clone(),
            as_of: ctx.as_of,
            processed_at: ctx.processed_at(),
            source_digest: source_digest.into(),
            config_fingerprint: config_fingerprint.into(),
            status,
            entities,
            format_version: 1,
        }
    }

    /// Build a manifest from the rejections of a run. `read` and `accepted`
    /// hold the per-entity row counts.
    pub fn summarize(
        ctx: &RunContext,
        source_digest: impl Into<String>,
        config_fingerprint: impl Into<String>,
        read: &BTreeMap<EntityKind, usize>,
        accepted: &BTreeMap<EntityKind, usize>,
        rejections: &[Rejection],
    ) -> Self {
        let entities = EntityKind::ALL
            .iter()
            .map(|entity| {
                let rejected: Vec<&Rejection> =
                    rejections.iter().filter(|r| r.entity == *entity).collect();
                let summary = EntitySummary::new(
                    read.get(entity).copied().unwrap_or(0),
                    accepted.get(entity).copied().unwrap_or(0),
                    &rejected,
                );
                (entity.as_str().to_string(), summary)
            })
            .collect();
        Self::new(ctx, source_digest, config_fingerprint, entities)
    }

    pub fn total_accepted(&self) -> usize {
        self.entities.values().map(|e| e.accepted).sum()
    }

    pub fn total_rejected(&self) -> usize {
        self.entities.values().map(|e| e.rejected).sum()
    }

    /// `<gold_root>/_manifests/<batch_id>.json`
    pub fn path_for(gold_root: &Path, batch_id: &str) -> PathBuf {
        gold_root
            .join(MANIFESTS_DIR)
            .join(format!("{}.json", batch_id))
    }

    pub fn to_json(&self) -> StageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> StageResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write atomically; an identical manifest is left untouched.
    pub fn write_to_file(&self, path: &Path) -> StageResult<WriteOutcome> {
        let mut json = self.to_json()?;
        json.push('\n');
        write_atomic(path, json.as_bytes())
    }

    pub fn read_from_file(path: &Path) -> StageResult<Self> {
        let json = fs::read_to_string(path).map_err(|source| StageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}
