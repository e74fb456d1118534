//! Health Warehouse Core Library
//!
//! Validation, feature derivation and staged, idempotent loading of
//! healthcare claims data into an analytics warehouse.
//!
//! # Architecture
//!
//! ```text
//! source CSVs (patients, providers, medications, diagnosis_codes, claims, prescriptions)
//!        │
//!        ▼
//!   [BRONZE: raw rows as read]
//!        │
//!   Record Validator ──────────────▶ rejection log
//!        │
//!   Feature Deriver
//!        │
//!   [SILVER: validated + derived]
//!        │
//!   reference check
//!        │
//!   [GOLD: load-ready] ──────────────▶ run manifest
//!        │
//!        ▼
//!   ┌─────────────────────────────────┐
//!   │     Load / Upsert Committer     │
//!   │  dimensions, then facts, one tx │
//!   └───────────────┬─────────────────┘
//!                   │
//!           ┌───────┴────────┐
//!           ▼                ▼
//!     Quality checks   Provider metrics
//! ```
//!
//! # Core Principle
//!
//! **Re-running a batch changes nothing.** Batch ids come from the input
//! bytes, every timestamp from the batch's as-of date, and every load is a
//! keyed upsert.
//!
//! # Modules
//!
//! - [`config`]: Thresholds, bucket boundaries and stage paths
//! - [`models`]: Domain types (Patient, Provider, Claim, Prescription, etc.)
//! - [`ingest`]: CSV input and per-table column schemas
//! - [`validate`]: Record Validator and rejection log entries
//! - [`derive`]: Feature Deriver
//! - [`stage`]: Bronze/Silver/Gold writers and the run manifest
//! - [`db`]: SQLite warehouse
//! - [`commit`]: Transactional upsert of a Gold batch
//! - [`pipeline`]: Extract, transform and load orchestration
//! - [`report`]: Quality checks and provider metrics

pub mod commit;
pub mod config;
pub mod db;
pub mod derive;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod stage;
pub mod validate;

// Re-export commonly used types
pub use commit::{CommitError, CommitReport, Committer};
pub use config::{DeriverConfig, PipelineConfig, ValidationConfig};
pub use db::{Database, DbError, ProviderMetrics};
pub use derive::{DerivationError, FeatureDeriver};
pub use models::{
    Claim, CuratedBatch, DiagnosisCode, EntityKind, GoldBatch, Medication, Patient,
    Prescription, Provider, RawRecord,
};
pub use pipeline::{BatchInfo, Pipeline, PipelineError, PipelineResult, RunSummary};
pub use report::{run_quality_checks, QualityReport};
pub use stage::{RunContext, RunManifest, Stage, StageWriter};
pub use validate::{KnownKeys, Rejection, Rule, ValidationError, Validator};
