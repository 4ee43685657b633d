use tracing::{info, instrument};

use crate::app::ports::Destination;
use crate::error::Result;
use crate::types::TableStats;

/// Read-only summary of the destination table for post-load verification.
/// Failures propagate; there is no partial report.
pub struct StatsReporter;

impl StatsReporter {
    #[instrument(skip_all, fields(destination = destination.name()))]
    pub async fn collect(destination: &mut dyn Destination) -> Result<TableStats> {
        let stats = destination.table_stats().await?;
        info!(
            total_records = stats.total_records,
            unique_customers = stats.unique_customers,
            product_lines = stats.product_lines,
            "Retrieved table statistics"
        );
        Ok(stats)
    }
}
