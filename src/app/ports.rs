use async_trait::async_trait;

use crate::error::Result;
use crate::types::{RowPayload, TableStats};

/// Write destination for cleaned sales rows.
///
/// One connection, used sequentially: the loader opens a transaction,
/// writes batches, then commits or rolls back; the stats reporter reads
/// afterwards. Inserts whose identity key already exists are no-ops.
#[async_trait]
pub trait Destination: Send {
    /// Short label for logs
    fn name(&self) -> &'static str;

    /// Create the destination table if it does not exist
    async fn ensure_table(&mut self) -> Result<()>;

    async fn begin(&mut self) -> Result<()>;

    /// Upsert-or-ignore a batch, returning how many rows were actually inserted
    async fn insert_batch(&mut self, rows: &[RowPayload]) -> Result<u64>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    async fn count_rows(&mut self) -> Result<i64>;

    async fn table_stats(&mut self) -> Result<TableStats>;

    /// Release the connection
    async fn close(self: Box<Self>) -> Result<()>;
}
