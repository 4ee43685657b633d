use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use crate::app::ports::Destination;
use crate::config::DbConfig;
use crate::constants::{destination_columns, RAW_SALES_TABLE};
use crate::error::{IngestError, Result};
use crate::types::{RowPayload, SqlValue, TableStats};

/// Postgres caps bind parameters per statement at 65535
const MAX_BIND_PARAMS: usize = 65_535;

/// Placeholder casts, in destination column order. Explicit casts pin the
/// parameter types so the driver accepts the payload's native values.
const PARAM_CASTS: [&str; 12] = [
    "bigint", "bigint", "date", "text", "text", "text", "text", "text", "bigint", "numeric",
    "numeric", "text",
];

const SCHEMA: &str = include_str!("../../migrations/001_create_raw_sales.sql");

/// `raw_sales` in Postgres over a single `tokio-postgres` connection
pub struct PostgresDestination {
    client: Client,
    connection: JoinHandle<()>,
}

impl PostgresDestination {
    /// Connect with explicit parameters
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        info!("Connecting to PostgreSQL at {}:{}", config.host, config.port);

        let (client, connection) = config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| IngestError::Connect {
                message: format!("Failed to connect to {}: {e}", config.database),
            })?;

        // The connection object performs the actual communication with the database
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        info!("Connected successfully");
        Ok(Self { client, connection })
    }

    fn insert_statement(rows: usize) -> String {
        let columns = destination_columns();
        let width = columns.len();
        let tuples: Vec<String> = (0..rows)
            .map(|row| {
                let placeholders: Vec<String> = PARAM_CASTS
                    .iter()
                    .enumerate()
                    .map(|(col, cast)| format!("${}::{}", row * width + col + 1, cast))
                    .collect();
                format!("({})", placeholders.join(", "))
            })
            .collect();

        format!(
            "INSERT INTO {RAW_SALES_TABLE} ({}) VALUES {} ON CONFLICT (order_number, order_line_number) DO NOTHING",
            columns.join(", "),
            tuples.join(", ")
        )
    }
}

fn to_pg_param(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Integer(v) => Box::new(*v),
        SqlValue::Text(v) => Box::new(v.clone()),
        SqlValue::Date(d) => Box::new(*d),
        SqlValue::Decimal(d) => Box::new(*d),
    }
}

#[async_trait]
impl Destination for PostgresDestination {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn ensure_table(&mut self) -> Result<()> {
        info!("Creating {} if missing", RAW_SALES_TABLE);
        self.client.batch_execute(SCHEMA).await?;
        Ok(())
    }

    async fn begin(&mut self) -> Result<()> {
        self.client.batch_execute("BEGIN").await?;
        Ok(())
    }

    async fn insert_batch(&mut self, rows: &[RowPayload]) -> Result<u64> {
        let rows_per_statement = MAX_BIND_PARAMS / PARAM_CASTS.len();
        let mut inserted = 0;

        for chunk in rows.chunks(rows_per_statement) {
            let params: Vec<Box<dyn ToSql + Sync + Send>> = chunk
                .iter()
                .flat_map(|row| row.values().iter().map(to_pg_param))
                .collect();
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();

            let sql = Self::insert_statement(chunk.len());
            inserted += self.client.execute(sql.as_str(), &refs).await?;
        }

        debug!(rows = rows.len(), inserted, "Executed insert batch");
        Ok(inserted)
    }

    async fn commit(&mut self) -> Result<()> {
        self.client.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.client.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn count_rows(&mut self) -> Result<i64> {
        let row = self
            .client
            .query_one(format!("SELECT COUNT(*) FROM {RAW_SALES_TABLE}").as_str(), &[])
            .await?;
        Ok(row.try_get(0)?)
    }

    async fn table_stats(&mut self) -> Result<TableStats> {
        let sql = format!(
            "SELECT COUNT(*), MIN(order_date), MAX(order_date), SUM(total_amount)::numeric, \
             COUNT(DISTINCT customer_name), COUNT(DISTINCT product_line) FROM {RAW_SALES_TABLE}"
        );
        let row = self.client.query_one(sql.as_str(), &[]).await?;

        Ok(TableStats {
            total_records: row.try_get(0)?,
            earliest_date: row.try_get::<_, Option<NaiveDate>>(1)?,
            latest_date: row.try_get::<_, Option<NaiveDate>>(2)?,
            total_sales: row.try_get::<_, Option<Decimal>>(3)?,
            unique_customers: row.try_get(4)?,
            product_lines: row.try_get(5)?,
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let PostgresDestination { client, connection } = *self;
        // Dropping the client ends the connection task
        drop(client);
        connection.await.map_err(|e| IngestError::Database {
            message: format!("Connection task failed: {e}"),
        })?;
        info!("Database connection closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_statement_numbers_placeholders_per_row() {
        let sql = PostgresDestination::insert_statement(2);

        assert!(sql.starts_with("INSERT INTO raw_sales (order_number, order_line_number, order_date"));
        assert!(sql.contains("($1::bigint, $2::bigint, $3::date"));
        assert!(sql.contains("($13::bigint, $14::bigint"));
        assert!(sql.contains("$24::text)"));
        assert!(sql.ends_with("ON CONFLICT (order_number, order_line_number) DO NOTHING"));
    }

    #[test]
    fn casts_cover_every_destination_column() {
        assert_eq!(PARAM_CASTS.len(), destination_columns().len());
    }

    /// Declared type of a column in the bootstrap DDL
    fn declared_type(column: &str) -> String {
        SCHEMA
            .lines()
            .map(str::trim)
            .find_map(|line| {
                let mut parts = line.split_whitespace();
                (parts.next() == Some(column)).then(|| parts.next().unwrap_or("").to_string())
            })
            .unwrap_or_else(|| panic!("column {column} missing from schema"))
    }

    #[test]
    fn schema_column_types_match_parameter_casts() {
        for (column, cast) in destination_columns().into_iter().zip(PARAM_CASTS) {
            assert_eq!(declared_type(column), cast.to_uppercase(), "column {column}");
        }
    }

    #[test]
    fn large_order_numbers_and_sub_cent_prices_fit_the_schema() {
        let mut record = crate::app::load_use_case::tests::record(3_000_000_000, 1);
        record.unit_price = Decimal::new(95705, 3);
        let payload = record.to_payload();

        assert_eq!(payload.values()[0], SqlValue::Integer(3_000_000_000));
        assert_eq!(declared_type("order_number"), "BIGINT");
        // No scale on NUMERIC, so 95.705 is stored as given
        assert_eq!(declared_type("unit_price"), "NUMERIC");
        assert!(!SCHEMA.contains("NUMERIC("));
    }
}
