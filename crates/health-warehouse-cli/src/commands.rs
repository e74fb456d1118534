//! CLI command implementations
//!
//! Commands open the configured warehouse themselves; nothing is held
//! between invocations except the stage directories and the database.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};

use health_warehouse_core::report::{write_provider_metrics_csv, write_provider_metrics_json};
use health_warehouse_core::{run_quality_checks, Pipeline, PipelineConfig, RunManifest};

use crate::args::{Cli, Command, MetricsFormat};

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let pipeline = Pipeline::new(config).context("invalid configuration")?;

    match cli.command {
        Command::Init => init(&pipeline),
        Command::Extract { source, as_of } => {
            let info = pipeline
                .extract(&source, resolve_as_of(as_of))
                .with_context(|| format!("failed to extract {}", source.display()))?;
            println!("{}", info.batch_id);
            Ok(())
        }
        Command::Transform { batch } => {
            let db = pipeline.open_database()?;
            let manifest = pipeline
                .transform(&batch, &db)
                .with_context(|| format!("failed to transform batch {}", batch))?;
            print_manifest(&manifest);
            Ok(())
        }
        Command::Load { batch } => {
            let db = pipeline.open_database()?;
            let report = pipeline
                .load(&batch, &db)
                .with_context(|| format!("failed to load batch {}", batch))?;
            println!(
                "Loaded batch {} ({} rows, load #{})",
                report.batch_id,
                report.total(),
                report.load_count
            );
            Ok(())
        }
        Command::Run { source, as_of } => {
            let db = pipeline.open_database()?;
            let summary = pipeline
                .run(&source, resolve_as_of(as_of), &db)
                .with_context(|| format!("failed to process {}", source.display()))?;
            print_manifest(&summary.manifest);
            println!(
                "Loaded {} rows (load #{})",
                summary.commit.total(),
                summary.commit.load_count
            );
            Ok(())
        }
        Command::Quality { json } => quality(&pipeline, json),
        Command::Metrics { format, output } => metrics(&pipeline, format, output.as_deref()),
        Command::Counts => {
            let db = pipeline.open_database()?;
            for (table, rows) in db.table_counts()? {
                println!("{:<16} {:>10}", table, rows);
            }
            Ok(())
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(pipeline.config())?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(PipelineConfig::from_env()),
    }
}

/// The processing date; today in UTC when not given.
fn resolve_as_of(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| {
        let today = Utc::now().date_naive();
        log::info!("No --as-of given, using {}", today);
        today
    })
}

fn init(pipeline: &Pipeline) -> Result<()> {
    let paths = &pipeline.config().paths;
    for dir in [&paths.bronze_path, &paths.silver_path, &paths.gold_path] {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    pipeline.open_database()?;
    println!("Initialized warehouse at {}", paths.database_path.display());
    Ok(())
}

fn print_manifest(manifest: &RunManifest) {
    println!("Batch {} ({})", manifest.batch_id, manifest.as_of);
    for (table, summary) in &manifest.entities {
        println!(
            "  {:<16} read {:>8}  accepted {:>8}  rejected {:>8}",
            table, summary.read, summary.accepted, summary.rejected
        );
    }
}

fn quality(pipeline: &Pipeline, json: bool) -> Result<()> {
    let db = pipeline.open_database()?;
    let report = run_quality_checks(&db)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for check in &report.checks {
            println!("{:<28} {}  {}", check.name, check.status, check.detail);
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        bail!("{} quality check(s) failed", failed);
    }
    Ok(())
}

fn metrics(pipeline: &Pipeline, format: MetricsFormat, output: Option<&Path>) -> Result<()> {
    let db = pipeline.open_database()?;
    let rows = db.provider_metrics()?;

    let out: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        MetricsFormat::Csv => write_provider_metrics_csv(&rows, out)?,
        MetricsFormat::Json => write_provider_metrics_json(&rows, out)?,
    }

    if let Some(path) = output {
        log::info!("Wrote {} provider rows to {}", rows.len(), path.display());
    }
    Ok(())
}
