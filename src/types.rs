use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One source row as produced by the CSV reader: header name to cell value.
/// Cells holding a missing-value token are stored as `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: HashMap<String, Option<String>>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from header/value pairs, typically in tests
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, Option<V>)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.map(Into::into)))
            .collect();
        Self { fields }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: Option<String>) {
        self.fields.insert(column.into(), value);
    }

    /// Value of a column, `None` when the column is absent or the cell is missing
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(|v| v.as_deref())
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }
}

/// A cleaned, validated sales line item keyed by `(order_number, order_line_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    pub order_number: i64,
    pub order_line_number: i64,
    pub order_date: NaiveDate,
    pub status: String,
    pub product_code: String,
    pub product_line: String,
    pub customer_name: String,
    pub country: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub deal_size: String,
}

impl SalesRecord {
    pub fn key(&self) -> (i64, i64) {
        (self.order_number, self.order_line_number)
    }

    /// Driver-independent write payload, values in `raw_sales` column order
    pub fn to_payload(&self) -> RowPayload {
        RowPayload(vec![
            SqlValue::Integer(self.order_number),
            SqlValue::Integer(self.order_line_number),
            SqlValue::Date(self.order_date),
            SqlValue::Text(self.status.clone()),
            SqlValue::Text(self.product_code.clone()),
            SqlValue::Text(self.product_line.clone()),
            SqlValue::Text(self.customer_name.clone()),
            SqlValue::Text(self.country.clone()),
            SqlValue::Integer(self.quantity),
            SqlValue::Decimal(self.unit_price),
            SqlValue::Decimal(self.total_amount),
            SqlValue::Text(self.deal_size.clone()),
        ])
    }
}

/// A single bound parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
    Date(NaiveDate),
    Decimal(Decimal),
}

/// One row ready to be written, independent of the destination driver
#[derive(Debug, Clone, PartialEq)]
pub struct RowPayload(pub Vec<SqlValue>);

impl RowPayload {
    pub fn values(&self) -> &[SqlValue] {
        &self.0
    }
}

impl From<&SalesRecord> for RowPayload {
    fn from(record: &SalesRecord) -> Self {
        record.to_payload()
    }
}

/// Aggregate summary of the destination table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableStats {
    pub total_records: i64,
    pub earliest_date: Option<NaiveDate>,
    pub latest_date: Option<NaiveDate>,
    pub total_sales: Option<Decimal>,
    pub unique_customers: i64,
    pub product_lines: i64,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_else(|| "n/a".into());
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "   Total records: {}", self.total_records)?;
        writeln!(
            f,
            "   Date range: {} to {}",
            date(self.earliest_date),
            date(self.latest_date)
        )?;
        writeln!(
            f,
            "   Total sales: ${}",
            format_amount(self.total_sales.unwrap_or_default())
        )?;
        writeln!(f, "   Unique customers: {}", self.unique_customers)?;
        write!(f, "   Product lines: {}", self.product_lines)
    }
}

/// Two decimal places with thousands separators, e.g. `1,234,567.89`
pub fn format_amount(amount: Decimal) -> String {
    let fixed = format!("{:.2}", amount.round_dp(2));
    let (sign, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{frac_part}")
}
