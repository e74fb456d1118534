//! Provider metrics export.

use std::io::Write;

use super::ReportResult;
use crate::db::ProviderMetrics;

/// Write provider metrics as CSV with a header row.
pub fn write_provider_metrics_csv<W: Write>(metrics: &[ProviderMetrics], out: W) -> ReportResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    for row in metrics {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write provider metrics as a pretty-printed JSON array.
pub fn write_provider_metrics_json<W: Write>(
    metrics: &[ProviderMetrics],
    mut out: W,
) -> ReportResult<()> {
    serde_json::to_writer_pretty(&mut out, metrics)?;
    writeln!(out)?;
    Ok(())
}
