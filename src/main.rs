use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, warn};

use sales_ingest::config::{DbConfig, DestinationConfig, IngestSettings};
use sales_ingest::pipeline::{self, Pipeline};
use sales_ingest::{logging, observability};

#[derive(Parser)]
#[command(name = "sales_ingest")]
#[command(about = "Clean a sales CSV export and load it into raw_sales")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ingest.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct DestinationArgs {
    /// Write to a local SQLite file instead of PostgreSQL
    #[arg(long)]
    sqlite: Option<PathBuf>,
}

impl DestinationArgs {
    fn resolve(&self) -> anyhow::Result<DestinationConfig> {
        match &self.sqlite {
            Some(path) => Ok(DestinationConfig::Sqlite(path.clone())),
            None => Ok(DestinationConfig::Postgres(
                DbConfig::from_env().context("database settings are incomplete")?,
            )),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Read, clean, load and report
    Run {
        /// CSV export to ingest
        #[arg(long)]
        input: Option<PathBuf>,
        /// Rows per insert round-trip
        #[arg(long)]
        batch_size: Option<usize>,
        /// Directory for the JSON run report and metrics snapshot
        #[arg(long)]
        report_dir: Option<PathBuf>,
        #[command(flatten)]
        destination: DestinationArgs,
    },
    /// Read and clean only, printing the cleaning summary
    Clean {
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Print statistics for the destination table
    Stats {
        #[command(flatten)]
        destination: DestinationArgs,
    },
    /// Create raw_sales if it does not exist
    InitDb {
        #[command(flatten)]
        destination: DestinationArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine when the environment is already set
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let mut settings = IngestSettings::load(cli.config.as_deref())
        .context("failed to load settings")?;

    match cli.command {
        Commands::Run {
            input,
            batch_size,
            report_dir,
            destination,
        } => {
            if let Some(input) = input {
                settings.source_path = input;
            }
            if let Some(batch_size) = batch_size {
                settings.batch_size = batch_size;
            }
            if report_dir.is_some() {
                settings.report_dir = report_dir;
            }
            settings.validate()?;

            if let Err(e) = observability::init() {
                warn!("Metrics recorder not installed: {}", e);
            }

            let destination = destination.resolve()?;
            let result = Pipeline::new(settings, destination)
                .run()
                .await
                .inspect_err(|e| error!("Pipeline failed: {}", e))
                .context("pipeline failed")?;

            info!(run_id = %result.run_id, "Run complete");
            println!("   Rows inserted: {}", result.load.inserted);
            println!("   Rows already present: {}", result.load.skipped());
            if let Some(path) = result.report_path {
                println!("   Run report: {}", path.display());
            }
        }
        Commands::Clean { input } => {
            if let Some(input) = input {
                settings.source_path = input;
            }
            let (_, cleaned) =
                pipeline::read_and_clean(&settings.source_path).context("cleaning failed")?;
            println!("{} records ready to load", cleaned.records.len());
        }
        Commands::Stats { destination } => {
            let destination = destination.resolve()?;
            pipeline::report_stats(&destination)
                .await
                .context("failed to retrieve statistics")?;
        }
        Commands::InitDb { destination } => {
            let destination = destination.resolve()?;
            pipeline::init_destination(&destination)
                .await
                .context("failed to create raw_sales")?;
        }
    }

    Ok(())
}
