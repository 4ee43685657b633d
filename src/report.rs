use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::app::LoadOutcome;
use crate::error::Result;
use crate::pipeline::processing::CleaningReport;
use crate::types::TableStats;

/// Audit record of one pipeline run, written as JSON next to other runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source_path: PathBuf,
    pub source_sha256: String,
    pub destination: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cleaning: CleaningReport,
    pub load: LoadOutcome,
    pub stats: TableStats,
}

impl RunReport {
    pub fn file_name(&self) -> String {
        format!("ingest_run_{}.json", self.started_at.format("%Y%m%dT%H%M%SZ"))
    }

    /// Write the report into `dir`, returning the file path
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(run_id = %self.run_id, path = %path.display(), "Wrote run report");
        Ok(path)
    }
}

/// Write the Prometheus exposition text, if a recorder is installed
pub fn write_metrics(dir: &Path) -> Result<Option<PathBuf>> {
    let Some(body) = crate::observability::render() else {
        return Ok(None);
    };
    fs::create_dir_all(dir)?;
    let path = dir.join("metrics.prom");
    fs::write(&path, body)?;
    Ok(Some(path))
}
