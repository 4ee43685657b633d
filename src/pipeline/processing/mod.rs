// Pipeline processing: date normalization, validation, and deduplication

pub mod cleaning;
pub mod dates;

// Re-export key types and functions
pub use cleaning::{clean_sales_data, CleanedData, CleaningReport};
pub use dates::parse_order_date;
