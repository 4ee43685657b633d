pub mod postgres_destination;
pub mod sqlite_destination;

pub use postgres_destination::PostgresDestination;
pub use sqlite_destination::SqliteDestination;

use crate::app::ports::Destination;
use crate::config::DestinationConfig;
use crate::error::Result;

/// Open the configured destination
pub async fn connect_destination(config: &DestinationConfig) -> Result<Box<dyn Destination>> {
    match config {
        DestinationConfig::Postgres(db) => Ok(Box::new(PostgresDestination::connect(db).await?)),
        DestinationConfig::Sqlite(path) => Ok(Box::new(SqliteDestination::open(path)?)),
    }
}
