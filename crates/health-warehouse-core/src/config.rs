//! Pipeline configuration.
//!
//! All bucket boundaries and thresholds used by the feature deriver are
//! explicit, typed configuration. A JSON file may override any section;
//! missing sections fall back to the defaults below. Storage paths can also
//! be overridden from the environment:
//!
//! - `BRONZE_PATH` (default: ./data/bronze)
//! - `SILVER_PATH` (default: ./data/silver)
//! - `GOLD_PATH` (default: ./data/gold)
//! - `WAREHOUSE_DB_PATH` (default: ./data/warehouse.db)

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::HospitalSize;

/// Configuration errors. Fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid {name} buckets: {reason}")]
    InvalidBuckets { name: &'static str, reason: String },

    #[error("invalid {name}: {reason}")]
    InvalidThreshold { name: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// A band starting at `lower` (inclusive) and extending to the next band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Band<T> {
    pub lower: T,
    pub label: String,
}

/// Ordered, lower-bound inclusive bands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Buckets<T> {
    pub bands: Vec<Band<T>>,
}

/// Numeric types usable as bucket boundaries.
pub trait Boundary: Copy + PartialOrd + fmt::Display {
    fn is_valid(&self) -> bool;
}

impl Boundary for i64 {
    fn is_valid(&self) -> bool {
        true
    }
}

impl Boundary for f64 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl<T: Boundary> Buckets<T> {
    pub fn new(bands: &[(T, &str)]) -> Self {
        Self {
            bands: bands
                .iter()
                .map(|(lower, label)| Band {
                    lower: *lower,
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    /// Label of the last band whose lower bound is <= `value`.
    /// `None` when `value` falls below the first band.
    pub fn classify(&self, value: T) -> Option<&str> {
        self.bands
            .iter()
            .take_while(|band| band.lower <= value)
            .last()
            .map(|band| band.label.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|band| band.label.as_str())
    }

    /// Bands must be non-empty, strictly ascending and labelled, and the
    /// first band must start at or below `floor` so every valid value
    /// classifies.
    pub fn check(&self, name: &'static str, floor: T) -> ConfigResult<()> {
        let invalid = |reason: String| ConfigError::InvalidBuckets { name, reason };

        let first = self
            .bands
            .first()
            .ok_or_else(|| invalid("no bands configured".into()))?;
        if first.lower > floor {
            return Err(invalid(format!(
                "first band starts at {} but values from {} must classify",
                first.lower, floor
            )));
        }
        for band in &self.bands {
            if !band.lower.is_valid() {
                return Err(invalid(format!("boundary {} is not a finite number", band.lower)));
            }
            if band.label.trim().is_empty() {
                return Err(invalid(format!("band at {} has an empty label", band.lower)));
            }
        }
        for pair in self.bands.windows(2) {
            if !(pair[0].lower < pair[1].lower) {
                return Err(invalid(format!(
                    "boundaries must be strictly ascending ({} then {})",
                    pair[0].lower, pair[1].lower
                )));
            }
        }
        Ok(())
    }
}

/// Visit recency thresholds for patient status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientStatusThresholds {
    /// Active when the last visit is at most this many days ago
    pub active_within_days: i64,
    /// Inactive up to this many days; Dormant beyond
    pub inactive_within_days: i64,
}

impl Default for PatientStatusThresholds {
    fn default() -> Self {
        Self {
            active_within_days: 90,
            inactive_within_days: 365,
        }
    }
}

/// Bucket boundaries and thresholds for the feature deriver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeriverConfig {
    /// Age in years
    pub age_categories: Buckets<i64>,
    /// Number of chronic conditions
    pub risk_levels: Buckets<i64>,
    /// Claim cost
    pub cost_categories: Buckets<f64>,
    /// Length of stay in days
    pub los_categories: Buckets<i64>,
    /// Adherence rate in [0, 1]
    pub adherence_categories: Buckets<f64>,
    /// Bed count; labels must be hospital size names
    pub hospital_sizes: Buckets<i64>,
    /// Readmissions at most this many days after discharge are flagged
    pub readmission_window_days: i64,
    pub patient_status: PatientStatusThresholds,
}

impl Default for DeriverConfig {
    fn default() -> Self {
        Self {
            age_categories: Buckets::new(&[
                (0, "Pediatric"),
                (18, "Young Adult"),
                (36, "Adult"),
                (56, "Middle Age"),
                (66, "Senior"),
            ]),
            risk_levels: Buckets::new(&[(0, "Low"), (1, "Medium"), (3, "High")]),
            cost_categories: Buckets::new(&[
                (0.0, "Low"),
                (1000.0, "Medium"),
                (5000.0, "High"),
                (15000.0, "Very High"),
            ]),
            los_categories: Buckets::new(&[
                (0, "Same Day"),
                (1, "Short"),
                (4, "Medium"),
                (8, "Long"),
            ]),
            adherence_categories: Buckets::new(&[
                (0.0, "Poor"),
                (0.5, "Needs Improvement"),
                (0.8, "Good"),
            ]),
            hospital_sizes: Buckets::new(&[
                (1, "Small"),
                (101, "Medium"),
                (301, "Large"),
                (601, "Very Large"),
            ]),
            readmission_window_days: 30,
            patient_status: PatientStatusThresholds::default(),
        }
    }
}

impl DeriverConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        self.age_categories.check("age_categories", 0)?;
        self.risk_levels.check("risk_levels", 0)?;
        self.cost_categories.check("cost_categories", 0.0)?;
        self.los_categories.check("los_categories", 0)?;
        self.adherence_categories.check("adherence_categories", 0.0)?;
        self.hospital_sizes.check("hospital_sizes", 1)?;

        if let Some(label) = self
            .hospital_sizes
            .labels()
            .find(|label| HospitalSize::from_label(label).is_none())
        {
            return Err(ConfigError::InvalidBuckets {
                name: "hospital_sizes",
                reason: format!("unknown hospital size {:?}", label),
            });
        }

        if self.readmission_window_days < 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "readmission_window_days",
                reason: format!("must not be negative, got {}", self.readmission_window_days),
            });
        }

        let status = &self.patient_status;
        if status.active_within_days < 0 || status.inactive_within_days < status.active_within_days
        {
            return Err(ConfigError::InvalidThreshold {
                name: "patient_status",
                reason: format!(
                    "need 0 <= active_within_days ({}) <= inactive_within_days ({})",
                    status.active_within_days, status.inactive_within_days
                ),
            });
        }
        Ok(())
    }
}

/// Domain limits enforced by the validator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationConfig {
    pub min_age: i64,
    pub max_age: i64,
    /// Claims with a longer stay are rejected
    pub max_length_of_stay_days: i64,
    /// Accepted claims above this cost are logged as anomalies
    pub high_cost_warning: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_age: 0,
            max_age: 120,
            max_length_of_stay_days: 365,
            high_cost_warning: 1_000_000.0,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.min_age < 0 || self.max_age < self.min_age {
            return Err(ConfigError::InvalidThreshold {
                name: "age range",
                reason: format!("need 0 <= min_age ({}) <= max_age ({})", self.min_age, self.max_age),
            });
        }
        if self.max_length_of_stay_days < 0 {
            return Err(ConfigError::InvalidThreshold {
                name: "max_length_of_stay_days",
                reason: format!("must not be negative, got {}", self.max_length_of_stay_days),
            });
        }
        if !(self.high_cost_warning.is_finite() && self.high_cost_warning > 0.0) {
            return Err(ConfigError::InvalidThreshold {
                name: "high_cost_warning",
                reason: format!("must be a positive number, got {}", self.high_cost_warning),
            });
        }
        Ok(())
    }
}

/// Stage directories and warehouse location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub bronze_path: PathBuf,
    pub silver_path: PathBuf,
    pub gold_path: PathBuf,
    pub database_path: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            bronze_path: PathBuf::from("./data/bronze"),
            silver_path: PathBuf::from("./data/silver"),
            gold_path: PathBuf::from("./data/gold"),
            database_path: PathBuf::from("./data/warehouse.db"),
        }
    }
}

impl PathsConfig {
    /// Replace paths with any set environment variables.
    pub fn apply_env(&mut self) {
        let vars: [(&str, &mut PathBuf); 4] = [
            ("BRONZE_PATH", &mut self.bronze_path),
            ("SILVER_PATH", &mut self.silver_path),
            ("GOLD_PATH", &mut self.gold_path),
            ("WAREHOUSE_DB_PATH", &mut self.database_path),
        ];
        for (name, slot) in vars {
            if let Ok(value) = env::var(name) {
                if !value.trim().is_empty() {
                    *slot = PathBuf::from(value);
                }
            }
        }
    }
}

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub validation: ValidationConfig,
    pub deriver: DeriverConfig,
}

impl PipelineConfig {
    /// Defaults with environment path overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.paths.apply_env();
        config
    }

    /// Load a JSON config file, then apply environment path overrides.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&text)?;
        config.paths.apply_env();
        Ok(config)
    }

    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.validation.validate()?;
        self.deriver.validate()
    }

    /// SHA-256 of the rules that shape stage output (validation and
    /// derivation, not paths), recorded in run manifests.
    pub fn fingerprint(&self) -> ConfigResult<String> {
        let rules = serde_json::to_vec(&(&self.validation, &self.deriver))?;
        Ok(hex::encode(Sha256::digest(&rules)))
    }
}
