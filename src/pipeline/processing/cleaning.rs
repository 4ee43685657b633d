use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::dates::parse_order_date;
use crate::constants::{self, COLUMN_MAPPING};
use crate::error::{IngestError, Result};
use crate::types::{RawRecord, SalesRecord};

/// Rows removed at each cleaning stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub initial_rows: usize,
    pub invalid_dates: usize,
    pub critical_nulls: usize,
    pub coercion_failures: usize,
    pub out_of_range: usize,
    pub duplicates: usize,
    pub final_rows: usize,
}

impl CleaningReport {
    pub fn rows_removed(&self) -> usize {
        self.initial_rows.saturating_sub(self.final_rows)
    }

    /// Share of input rows removed, 0.0 for an empty input
    pub fn removed_pct(&self) -> f64 {
        if self.initial_rows == 0 {
            return 0.0;
        }
        self.rows_removed() as f64 / self.initial_rows as f64 * 100.0
    }

    /// Drop categories with a non-zero count, in stage order
    pub fn drop_reasons(&self) -> Vec<(&'static str, usize)> {
        [
            ("invalid dates", self.invalid_dates),
            ("nulls in critical fields", self.critical_nulls),
            ("failed numeric conversion", self.coercion_failures),
            ("out-of-range values", self.out_of_range),
            ("duplicate order lines", self.duplicates),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

impl fmt::Display for CleaningReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cleaning Summary:")?;
        for (reason, count) in self.drop_reasons() {
            writeln!(f, "   Removed {count} rows with {reason}")?;
        }
        writeln!(f, "   Initial rows: {}", self.initial_rows)?;
        writeln!(f, "   Final rows: {}", self.final_rows)?;
        write!(
            f,
            "   Rows removed: {} ({:.1}%)",
            self.rows_removed(),
            self.removed_pct()
        )
    }
}

/// Output of the cleaning pipeline
#[derive(Debug, Clone, Default)]
pub struct CleanedData {
    pub records: Vec<SalesRecord>,
    pub report: CleaningReport,
}

/// A projected row with canonical field names; values are still raw text
#[derive(Debug, Clone)]
struct ProjectedRow {
    order_number: Option<String>,
    order_line_number: Option<String>,
    order_date: Option<String>,
    status: Option<String>,
    product_code: Option<String>,
    product_line: Option<String>,
    customer_name: Option<String>,
    country: Option<String>,
    quantity: Option<String>,
    unit_price: Option<String>,
    total_amount: Option<String>,
    deal_size: Option<String>,
}

/// A row after date parsing and default filling
#[derive(Debug, Clone)]
struct DatedRow {
    order_date: NaiveDate,
    status: String,
    product_line: String,
    customer_name: String,
    country: String,
    deal_size: String,
    order_number: Option<String>,
    order_line_number: Option<String>,
    product_code: Option<String>,
    quantity: Option<String>,
    unit_price: Option<String>,
    total_amount: Option<String>,
}

/// Critical fields present, numbers not yet coerced
#[derive(Debug, Clone)]
struct CompleteRow {
    base: DatedRow,
    order_number: String,
    order_line_number: String,
    product_code: String,
    quantity: String,
    unit_price: String,
    total_amount: String,
}

/// Clean raw sales rows into validated, deduplicated records.
///
/// Stages run in a fixed order, each over the rows the previous stage kept:
/// column projection, date parsing, dropping unparseable dates, default
/// filling, dropping critical nulls, numeric coercion, range validation and
/// keep-first deduplication on `(order_number, order_line_number)`.
///
/// Per-row problems only remove the row and are counted in the report.
/// A source missing any required column is an error.
#[instrument(skip_all, fields(rows = rows.len()))]
pub fn clean_sales_data(headers: &[String], rows: &[RawRecord]) -> Result<CleanedData> {
    info!("Starting data cleaning");
    let mut report = CleaningReport {
        initial_rows: rows.len(),
        ..Default::default()
    };

    let projected = project_columns(headers, rows)?;
    debug!("Selected {} columns", COLUMN_MAPPING.len());

    let dated = parse_dates(projected, &mut report);
    let complete = drop_critical_nulls(dated, &mut report);
    let coerced = coerce_numeric(complete, &mut report);
    let valid = validate_ranges(coerced, &mut report);
    let records = drop_duplicates(valid, &mut report);

    report.final_rows = records.len();
    info!(
        initial = report.initial_rows,
        final_rows = report.final_rows,
        removed = report.rows_removed(),
        "Data cleaning finished"
    );

    Ok(CleanedData { records, report })
}

/// Stage 1: select the required columns under their canonical names
fn project_columns(headers: &[String], rows: &[RawRecord]) -> Result<Vec<ProjectedRow>> {
    let missing: Vec<String> = constants::required_source_columns()
        .into_iter()
        .filter(|required| !headers.iter().any(|h| h == required))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns(missing));
    }

    let take = |row: &RawRecord, column: &str| row.get(column).map(str::to_string);
    Ok(rows
        .iter()
        .map(|row| ProjectedRow {
            order_number: take(row, constants::ORDERNUMBER),
            order_line_number: take(row, constants::ORDERLINENUMBER),
            order_date: take(row, constants::ORDERDATE),
            status: take(row, constants::STATUS),
            product_code: take(row, constants::PRODUCTCODE),
            product_line: take(row, constants::PRODUCTLINE),
            customer_name: take(row, constants::CUSTOMERNAME),
            country: take(row, constants::COUNTRY),
            quantity: take(row, constants::QUANTITYORDERED),
            unit_price: take(row, constants::PRICEEACH),
            total_amount: take(row, constants::SALES),
            deal_size: take(row, constants::DEALSIZE),
        })
        .collect())
}

/// Stages 2-4: parse dates, drop unparseable ones, fill optional fields
fn parse_dates(rows: Vec<ProjectedRow>, report: &mut CleaningReport) -> Vec<DatedRow> {
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(order_date) = row.order_date.as_deref().and_then(parse_order_date) else {
            debug!(value = ?row.order_date, "Dropping row with invalid date");
            report.invalid_dates += 1;
            continue;
        };
        kept.push(DatedRow {
            order_date,
            status: fill(row.status, constants::DEFAULT_STATUS),
            product_line: fill(row.product_line, constants::DEFAULT_PRODUCT_LINE),
            customer_name: fill(row.customer_name, constants::DEFAULT_CUSTOMER_NAME),
            country: fill(row.country, constants::DEFAULT_COUNTRY),
            deal_size: fill(row.deal_size, constants::DEFAULT_DEAL_SIZE),
            order_number: row.order_number,
            order_line_number: row.order_line_number,
            product_code: row.product_code,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_amount: row.total_amount,
        });
    }
    if report.invalid_dates > 0 {
        info!("Removed {} rows with invalid dates", report.invalid_dates);
    }
    kept
}

fn fill(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Stage 5: drop rows missing any critical field
fn drop_critical_nulls(rows: Vec<DatedRow>, report: &mut CleaningReport) -> Vec<CompleteRow> {
    let present = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let fields = (
            present(&row.order_number),
            present(&row.order_line_number),
            present(&row.product_code),
            present(&row.quantity),
            present(&row.unit_price),
            present(&row.total_amount),
        );
        match fields {
            (Some(order_number), Some(order_line_number), Some(product_code), Some(quantity), Some(unit_price), Some(total_amount)) => {
                kept.push(CompleteRow {
                    base: row,
                    order_number,
                    order_line_number,
                    product_code,
                    quantity,
                    unit_price,
                    total_amount,
                });
            }
            _ => {
                debug!(order_number = ?row.order_number, "Dropping row with null critical field");
                report.critical_nulls += 1;
            }
        }
    }
    if report.critical_nulls > 0 {
        info!("Removed {} rows with nulls in critical fields", report.critical_nulls);
    }
    kept
}

/// Stage 6: coerce numeric fields; a failed conversion drops the row
fn coerce_numeric(rows: Vec<CompleteRow>, report: &mut CleaningReport) -> Vec<SalesRecord> {
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let converted = (
            parse_integer(&row.order_number),
            parse_integer(&row.order_line_number),
            parse_integer(&row.quantity),
            parse_decimal(&row.unit_price),
            parse_decimal(&row.total_amount),
        );
        let (Some(order_number), Some(order_line_number), Some(quantity), Some(unit_price), Some(total_amount)) = converted else {
            debug!(order_number = %row.order_number, "Dropping row with non-numeric value");
            report.coercion_failures += 1;
            continue;
        };
        let base = row.base;
        kept.push(SalesRecord {
            order_number,
            order_line_number,
            order_date: base.order_date,
            status: base.status,
            product_code: row.product_code,
            product_line: base.product_line,
            customer_name: base.customer_name,
            country: base.country,
            quantity,
            unit_price,
            total_amount,
            deal_size: base.deal_size,
        });
    }
    if report.coercion_failures > 0 {
        info!("Removed {} rows with failed numeric conversion", report.coercion_failures);
    }
    kept
}

/// Integral text only: `"30"` and `"30.0"` convert, `"30.5"` does not
pub fn parse_integer(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n);
    }
    let decimal = parse_decimal(trimmed)?;
    if decimal.fract().is_zero() {
        decimal.to_i64()
    } else {
        None
    }
}

/// Plain or scientific notation
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}

/// Stage 7: quantity > 0, unit_price >= 0, total_amount >= 0
fn validate_ranges(rows: Vec<SalesRecord>, report: &mut CleaningReport) -> Vec<SalesRecord> {
    let before = rows.len();
    let kept: Vec<SalesRecord> = rows
        .into_iter()
        .filter(|r| r.quantity > 0 && r.unit_price >= Decimal::ZERO && r.total_amount >= Decimal::ZERO)
        .collect();
    report.out_of_range = before - kept.len();
    if report.out_of_range > 0 {
        info!("Removed {} rows with out-of-range values", report.out_of_range);
    }
    kept
}

/// Stage 8: keep the first row for each identity key
fn drop_duplicates(rows: Vec<SalesRecord>, report: &mut CleaningReport) -> Vec<SalesRecord> {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(rows.len());
    let kept: Vec<SalesRecord> = rows.into_iter().filter(|r| seen.insert(r.key())).collect();
    report.duplicates = before - kept.len();
    if report.duplicates > 0 {
        info!("Removed {} duplicate rows", report.duplicates);
    }
    kept
}
