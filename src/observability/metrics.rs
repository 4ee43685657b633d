//! Metrics for the ingest pipeline
//!
//! Values are recorded through the `metrics` facade. The binary installs a
//! Prometheus recorder; without one every call is a no-op.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

use crate::error::{IngestError, Result};

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Source metrics
    SourceRowsRead,
    SourceReadErrors,

    // Cleaning metrics
    CleaningRowsDropped,
    CleaningRowsKept,

    // Load metrics
    LoadBatchesWritten,
    LoadBatchSize,
    LoadRowsInserted,
    LoadRowsSkipped,
    LoadDuration,
    LoadFailures,

    // Pipeline metrics
    PipelineRuns,
    PipelineFailures,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourceRowsRead => "sales_ingest_source_rows_read_total",
            MetricName::SourceReadErrors => "sales_ingest_source_read_errors_total",

            MetricName::CleaningRowsDropped => "sales_ingest_cleaning_rows_dropped_total",
            MetricName::CleaningRowsKept => "sales_ingest_cleaning_rows_kept_total",

            MetricName::LoadBatchesWritten => "sales_ingest_load_batches_written_total",
            MetricName::LoadBatchSize => "sales_ingest_load_batch_size",
            MetricName::LoadRowsInserted => "sales_ingest_load_rows_inserted_total",
            MetricName::LoadRowsSkipped => "sales_ingest_load_rows_skipped_total",
            MetricName::LoadDuration => "sales_ingest_load_duration_seconds",
            MetricName::LoadFailures => "sales_ingest_load_failures_total",

            MetricName::PipelineRuns => "sales_ingest_pipeline_runs_total",
            MetricName::PipelineFailures => "sales_ingest_pipeline_failures_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| IngestError::Config(format!("Failed to install Prometheus recorder: {e}")))?;
    let _ = METRICS_HANDLE.set(handle);
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus text exposition of everything recorded so far
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Source Metrics
// ============================================================================

pub mod source {
    use super::MetricName;

    pub fn rows_read(rows: usize) {
        ::metrics::counter!(MetricName::SourceRowsRead.as_str()).increment(rows as u64);
    }

    pub fn read_failed() {
        ::metrics::counter!(MetricName::SourceReadErrors.as_str()).increment(1);
    }
}

// ============================================================================
// Cleaning Metrics
// ============================================================================

pub mod cleaning {
    use super::MetricName;
    use crate::pipeline::processing::CleaningReport;

    /// Record drop counts per reason and the surviving row count
    pub fn report_recorded(report: &CleaningReport) {
        for (reason, count) in report.drop_reasons() {
            ::metrics::counter!(MetricName::CleaningRowsDropped.as_str(), "reason" => reason)
                .increment(count as u64);
        }
        ::metrics::counter!(MetricName::CleaningRowsKept.as_str()).increment(report.final_rows as u64);
    }
}

// ============================================================================
// Load Metrics
// ============================================================================

pub mod load {
    use super::MetricName;

    pub fn batch_written(rows: usize, inserted: u64) {
        ::metrics::counter!(MetricName::LoadBatchesWritten.as_str()).increment(1);
        ::metrics::histogram!(MetricName::LoadBatchSize.as_str()).record(rows as f64);
        ::metrics::counter!(MetricName::LoadRowsSkipped.as_str())
            .increment((rows as u64).saturating_sub(inserted));
    }

    pub fn completed(inserted: u64, duration_secs: f64) {
        ::metrics::counter!(MetricName::LoadRowsInserted.as_str()).increment(inserted);
        ::metrics::histogram!(MetricName::LoadDuration.as_str()).record(duration_secs);
    }

    pub fn failed() {
        ::metrics::counter!(MetricName::LoadFailures.as_str()).increment(1);
    }
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

pub mod pipeline {
    use super::MetricName;

    pub fn run_started() {
        ::metrics::counter!(MetricName::PipelineRuns.as_str()).increment(1);
    }

    pub fn run_failed(stage: &'static str) {
        ::metrics::counter!(MetricName::PipelineFailures.as_str(), "stage" => stage).increment(1);
    }
}
