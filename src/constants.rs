//! Column names and fixed values shared by the reader, the cleaner and the destinations.

/// Destination table for cleaned sales lines
pub const RAW_SALES_TABLE: &str = "raw_sales";

/// Rows per write round-trip
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default source file when neither the CLI nor the settings file names one
pub const DEFAULT_SOURCE_PATH: &str = "sales_data_sample.csv";

/// Default settings file looked up in the working directory
pub const DEFAULT_SETTINGS_PATH: &str = "ingest.toml";

// Source header names
pub const ORDERNUMBER: &str = "ORDERNUMBER";
pub const ORDERLINENUMBER: &str = "ORDERLINENUMBER";
pub const ORDERDATE: &str = "ORDERDATE";
pub const STATUS: &str = "STATUS";
pub const PRODUCTCODE: &str = "PRODUCTCODE";
pub const PRODUCTLINE: &str = "PRODUCTLINE";
pub const CUSTOMERNAME: &str = "CUSTOMERNAME";
pub const COUNTRY: &str = "COUNTRY";
pub const QUANTITYORDERED: &str = "QUANTITYORDERED";
pub const PRICEEACH: &str = "PRICEEACH";
pub const SALES: &str = "SALES";
pub const DEALSIZE: &str = "DEALSIZE";

/// Source columns the cleaner projects, paired with their canonical names.
/// Order matches the `raw_sales` column order.
pub const COLUMN_MAPPING: [(&str, &str); 12] = [
    (ORDERNUMBER, "order_number"),
    (ORDERLINENUMBER, "order_line_number"),
    (ORDERDATE, "order_date"),
    (STATUS, "status"),
    (PRODUCTCODE, "product_code"),
    (PRODUCTLINE, "product_line"),
    (CUSTOMERNAME, "customer_name"),
    (COUNTRY, "country"),
    (QUANTITYORDERED, "quantity"),
    (PRICEEACH, "unit_price"),
    (SALES, "total_amount"),
    (DEALSIZE, "deal_size"),
];

// Fill values for optional attributes
pub const DEFAULT_STATUS: &str = "Unknown";
pub const DEFAULT_PRODUCT_LINE: &str = "Uncategorized";
pub const DEFAULT_CUSTOMER_NAME: &str = "Unknown Customer";
pub const DEFAULT_COUNTRY: &str = "Unknown";
pub const DEFAULT_DEAL_SIZE: &str = "Unknown";

/// Cell contents the reader treats as a missing value (besides the empty string)
pub const NA_VALUES: [&str; 19] = [
    "NA", "N/A", "n/a", "NULL", "null", "NaN", "nan", "-NaN", "-nan", "#N/A", "#NA", "#N/A N/A",
    "<NA>", "None", "1.#IND", "-1.#IND", "1.#QNAN", "-1.#QNAN", "",
];

/// Returns true when a raw cell should be read as absent
pub fn is_na_value(cell: &str) -> bool {
    NA_VALUES.contains(&cell)
}

/// Canonical attribute names in destination column order
pub fn destination_columns() -> Vec<&'static str> {
    COLUMN_MAPPING.iter().map(|(_, canonical)| *canonical).collect()
}

/// Source header names the cleaner requires
pub fn required_source_columns() -> Vec<&'static str> {
    COLUMN_MAPPING.iter().map(|(source, _)| *source).collect()
}
