//! CLI argument definitions using clap
//!
//! Commands:
//! - health-warehouse init
//! - health-warehouse extract <source> [--as-of <date>]
//! - health-warehouse transform <batch>
//! - health-warehouse load <batch>
//! - health-warehouse run <source> [--as-of <date>]
//! - health-warehouse quality [--json]
//! - health-warehouse metrics [--format csv|json] [--output <path>]
//! - health-warehouse counts
//! - health-warehouse config

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

/// Healthcare warehouse extract/transform/load runner
#[derive(Parser, Debug)]
#[command(name = "health-warehouse")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file; defaults apply when omitted
    #[arg(long, global = true, env = "WAREHOUSE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the stage directories and the warehouse schema
    Init,

    /// Stage a source directory of CSV files in Bronze
    Extract {
        /// Directory holding <table>.csv files
        source: PathBuf,

        /// Logical processing date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Validate and derive a Bronze batch through Silver to Gold
    Transform {
        /// Batch id printed by extract
        batch: String,
    },

    /// Commit a Gold batch to the warehouse
    Load {
        /// Batch id printed by extract
        batch: String,
    },

    /// Extract, transform and load a source directory
    Run {
        /// Directory holding <table>.csv files
        source: PathBuf,

        /// Logical processing date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },

    /// Run data-quality checks against the warehouse
    Quality {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export per-provider metrics
    Metrics {
        #[arg(long, value_enum, default_value_t = MetricsFormat::Csv)]
        format: MetricsFormat,

        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print row counts per warehouse table
    Counts,

    /// Print the effective configuration
    Config,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsFormat {
    Csv,
    Json,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
