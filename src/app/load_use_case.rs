use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::app::ports::Destination;
use crate::error::{IngestError, Result};
use crate::observability::metrics;
use crate::types::{RowPayload, SalesRecord};

/// Result of one load invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOutcome {
    /// Records handed to the loader
    pub attempted: usize,
    /// Rows actually inserted; keys already present are skipped
    pub inserted: u64,
    pub batches: usize,
    /// Destination row count after commit
    pub total_rows: i64,
}

impl LoadOutcome {
    pub fn skipped(&self) -> u64 {
        (self.attempted as u64).saturating_sub(self.inserted)
    }
}

/// Writes cleaned records in fixed-size batches inside a single transaction.
///
/// Any batch failure rolls back every write of the invocation and the error
/// is returned; on success the transaction is committed exactly once.
pub struct BatchLoader {
    batch_size: usize,
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(IngestError::Config("batch_size must be at least 1".to_string()));
        }
        Ok(Self { batch_size })
    }

    #[instrument(skip_all, fields(destination = destination.name(), records = records.len()))]
    pub async fn load(
        &self,
        records: &[SalesRecord],
        destination: &mut dyn Destination,
    ) -> Result<LoadOutcome> {
        info!("Inserting {} rows into database", records.len());
        let started = Instant::now();
        let payloads: Vec<RowPayload> = records.iter().map(RowPayload::from).collect();

        destination.begin().await?;

        let (inserted, batches) = match self.write_batches(&payloads, destination).await {
            Ok(written) => written,
            Err(e) => {
                error!("Insertion failed, rolling back: {}", e);
                if let Err(rollback_err) = destination.rollback().await {
                    warn!("Rollback failed: {}", rollback_err);
                }
                metrics::load::failed();
                return Err(e);
            }
        };

        if let Err(e) = destination.commit().await {
            error!("Commit failed: {}", e);
            metrics::load::failed();
            return Err(IngestError::Write {
                message: format!("commit failed: {e}"),
            });
        }

        let total_rows = destination.count_rows().await?;
        metrics::load::completed(inserted, started.elapsed().as_secs_f64());
        info!(inserted, batches, total_rows, "Insertion completed successfully");

        Ok(LoadOutcome {
            attempted: records.len(),
            inserted,
            batches,
            total_rows,
        })
    }

    async fn write_batches(
        &self,
        payloads: &[RowPayload],
        destination: &mut dyn Destination,
    ) -> Result<(u64, usize)> {
        let total_batches = payloads.len().div_ceil(self.batch_size);
        let mut inserted = 0u64;

        for (idx, batch) in payloads.chunks(self.batch_size).enumerate() {
            let written = destination.insert_batch(batch).await.map_err(|e| IngestError::Write {
                message: format!("batch {} of {}: {}", idx + 1, total_batches, e),
            })?;
            inserted += written;
            metrics::load::batch_written(batch.len(), written);
            debug!(
                batch = idx + 1,
                total_batches,
                rows = batch.len(),
                written,
                "Wrote batch"
            );
        }

        Ok((inserted, total_batches))
    }
}
