// Sales ingestion pipeline: read -> clean -> load -> stats

pub mod ingestion;
pub mod processing;

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::app::{BatchLoader, Destination, LoadOutcome, StatsReporter};
use crate::config::{DestinationConfig, IngestSettings};
use crate::error::Result;
use crate::infra::connect_destination;
use crate::observability::metrics;
use crate::report::{self, RunReport};
use crate::types::TableStats;

use ingestion::{read_source, SourceData};
use processing::{clean_sales_data, CleanedData, CleaningReport};

const BANNER_WIDTH: usize = 60;

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub cleaning: CleaningReport,
    pub load: LoadOutcome,
    pub stats: TableStats,
    pub report_path: Option<PathBuf>,
}

pub struct Pipeline {
    settings: IngestSettings,
    destination: DestinationConfig,
}

impl Pipeline {
    pub fn new(settings: IngestSettings, destination: DestinationConfig) -> Self {
        Self {
            settings,
            destination,
        }
    }

    /// Run every stage. The destination connection is released on every
    /// path once it has been opened.
    #[instrument(skip_all, fields(destination = %self.destination.describe()))]
    pub async fn run(&self) -> Result<PipelineResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        metrics::pipeline::run_started();
        print_banner("Starting Sales Data Ingestion Pipeline");
        info!(%run_id, "Pipeline started");

        let loader = BatchLoader::new(self.settings.batch_size)?;
        let (source, cleaned) = read_and_clean(&self.settings.source_path)?;

        println!("\n[3/4] Inserting data into database...");
        println!("Connecting to {}...", self.destination.describe());
        let mut destination = connect_destination(&self.destination)
            .await
            .inspect_err(|e| {
                println!("Connection failed: {e}");
                metrics::pipeline::run_failed("connect");
            })?;

        let outcome = load_and_report(&loader, &cleaned, destination.as_mut()).await;
        let closed = destination.close().await;
        println!("\nDatabase connection closed");

        let (load, stats) = match (outcome, closed) {
            (Ok(done), Ok(())) => done,
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    warn!("Closing the destination also failed: {}", close_err);
                }
                metrics::pipeline::run_failed("load");
                return Err(e);
            }
            (Ok(_), Err(e)) => {
                metrics::pipeline::run_failed("close");
                return Err(e);
            }
        };

        let report_path = match &self.settings.report_dir {
            Some(dir) => {
                let run_report = RunReport {
                    run_id,
                    source_path: source.path.clone(),
                    source_sha256: source.sha256.clone(),
                    destination: self.destination.describe(),
                    started_at,
                    finished_at: Utc::now(),
                    cleaning: cleaned.report.clone(),
                    load: load.clone(),
                    stats: stats.clone(),
                };
                let path = run_report.write_to(dir)?;
                report::write_metrics(dir)?;
                Some(path)
            }
            None => None,
        };

        print_banner("Pipeline completed successfully!");
        info!(%run_id, inserted = load.inserted, total_rows = load.total_rows, "Pipeline finished");

        Ok(PipelineResult {
            run_id,
            cleaning: cleaned.report,
            load,
            stats,
            report_path,
        })
    }
}

/// Read and clean the source. Fatal on a missing file, unreadable CSV
/// or absent required columns.
pub fn read_and_clean(path: &Path) -> Result<(SourceData, CleanedData)> {
    println!("\n[1/4] Reading CSV file: {}", path.display());
    let source = read_source(path).inspect_err(|e| {
        error!("Error reading source: {}", e);
        metrics::source::read_failed();
        metrics::pipeline::run_failed("read");
    })?;
    println!("Loaded {} rows from CSV", source.row_count());
    metrics::source::rows_read(source.row_count());

    println!("\n[2/4] Cleaning data...");
    let cleaned = clean_sales_data(&source.headers, &source.rows)
        .inspect_err(|_| metrics::pipeline::run_failed("clean"))?;
    metrics::cleaning::report_recorded(&cleaned.report);
    println!("{}", cleaned.report);

    Ok((source, cleaned))
}

async fn load_and_report(
    loader: &BatchLoader,
    cleaned: &CleanedData,
    destination: &mut dyn Destination,
) -> Result<(LoadOutcome, TableStats)> {
    destination.ensure_table().await?;

    println!("Inserting {} rows into database...", cleaned.records.len());
    let load = loader.load(&cleaned.records, destination).await.inspect_err(|e| {
        println!("Insertion failed: {e}");
    })?;
    println!("Insertion completed successfully");
    println!("Total rows in table: {}", load.total_rows);

    println!("\n[4/4] Retrieving database statistics...");
    let stats = StatsReporter::collect(destination).await?;
    println!("{stats}");

    Ok((load, stats))
}

/// Print table statistics only, releasing the connection afterwards
pub async fn report_stats(config: &DestinationConfig) -> Result<TableStats> {
    let mut destination = connect_destination(config).await?;
    let stats = StatsReporter::collect(destination.as_mut()).await;
    let closed = destination.close().await;
    let stats = stats?;
    closed?;
    println!("{stats}");
    Ok(stats)
}

/// Create `raw_sales` if it does not exist
pub async fn init_destination(config: &DestinationConfig) -> Result<()> {
    let mut destination = connect_destination(config).await?;
    let created = destination.ensure_table().await;
    let closed = destination.close().await;
    created?;
    closed?;
    println!("Table ready at {}", config.describe());
    Ok(())
}

fn print_banner(title: &str) {
    let rule = "=".repeat(BANNER_WIDTH);
    println!("{rule}\n{title}\n{rule}");
}
