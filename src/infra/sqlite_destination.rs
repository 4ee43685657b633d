use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::types::{ToSql, ToSqlOutput, Value};
use rusqlite::{params_from_iter, Connection};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::app::ports::Destination;
use crate::constants::{destination_columns, RAW_SALES_TABLE};
use crate::error::{IngestError, Result};
use crate::types::{RowPayload, SqlValue, TableStats};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS raw_sales (
        order_number      INTEGER NOT NULL,
        order_line_number INTEGER NOT NULL,
        order_date        TEXT    NOT NULL,
        status            TEXT,
        product_code      TEXT    NOT NULL,
        product_line      TEXT,
        customer_name     TEXT,
        country           TEXT,
        quantity          INTEGER NOT NULL CHECK (quantity > 0),
        unit_price        NUMERIC NOT NULL CHECK (unit_price >= 0),
        total_amount      NUMERIC NOT NULL CHECK (total_amount >= 0),
        deal_size         TEXT,
        UNIQUE (order_number, order_line_number)
    );
    CREATE INDEX IF NOT EXISTS raw_sales_order_date_idx ON raw_sales (order_date);
"#;

const DATE_FORMAT: &str = "%Y-%m-%d";

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Integer(v) => ToSqlOutput::from(*v),
            SqlValue::Text(v) => ToSqlOutput::from(v.as_str()),
            SqlValue::Date(d) => ToSqlOutput::Owned(Value::Text(d.format(DATE_FORMAT).to_string())),
            // NUMERIC affinity stores this as INTEGER or REAL, so SUM is a float
            // sum; table_stats rounds it to cents before parsing it back.
            SqlValue::Decimal(d) => ToSqlOutput::Owned(Value::Text(d.to_string())),
        })
    }
}

/// Local `raw_sales` table in a SQLite file, for development and tests.
/// Same contract as the Postgres destination.
pub struct SqliteDestination {
    conn: Connection,
}

impl SqliteDestination {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening SQLite destination at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn insert_sql() -> String {
        let columns = destination_columns();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        format!(
            "INSERT INTO {RAW_SALES_TABLE} ({}) VALUES ({}) ON CONFLICT(order_number, order_line_number) DO NOTHING",
            columns.join(", "),
            placeholders.join(", ")
        )
    }
}

fn parse_stored_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| IngestError::Database {
                message: format!("Stored order_date '{s}' is not a date: {e}"),
            })
        })
        .transpose()
}

fn parse_stored_amount(value: Option<String>) -> Result<Option<Decimal>> {
    value
        .map(|s| {
            Decimal::from_str(&s)
                .or_else(|_| Decimal::from_scientific(&s))
                .map_err(|e| IngestError::Database {
                    message: format!("Stored total '{s}' is not numeric: {e}"),
                })
        })
        .transpose()
}

#[async_trait]
impl Destination for SqliteDestination {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn ensure_table(&mut self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    async fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    async fn insert_batch(&mut self, rows: &[RowPayload]) -> Result<u64> {
        let sql = Self::insert_sql();
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut inserted = 0u64;
        for row in rows {
            inserted += stmt.execute(params_from_iter(row.values().iter()))? as u64;
        }
        debug!(rows = rows.len(), inserted, "Executed insert batch");
        Ok(inserted)
    }

    async fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    async fn count_rows(&mut self) -> Result<i64> {
        let count = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {RAW_SALES_TABLE}"),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    async fn table_stats(&mut self) -> Result<TableStats> {
        let sql = format!(
            "SELECT COUNT(*), MIN(order_date), MAX(order_date), \
             CAST(ROUND(SUM(total_amount), 2) AS TEXT), \
             COUNT(DISTINCT customer_name), COUNT(DISTINCT product_line) FROM {RAW_SALES_TABLE}"
        );
        let (total_records, earliest, latest, total, customers, lines) =
            self.conn.query_row(&sql, [], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?;

        Ok(TableStats {
            total_records,
            earliest_date: parse_stored_date(earliest)?,
            latest_date: parse_stored_date(latest)?,
            total_sales: parse_stored_amount(total)?,
            unique_customers: customers,
            product_lines: lines,
        })
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().map_err(|(_, e)| IngestError::from(e))?;
        info!("SQLite destination closed");
        Ok(())
    }
}
