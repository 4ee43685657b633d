pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod types;

// Layered boundaries: use cases and ports, then concrete destinations
pub mod app;
pub mod infra;

pub use error::{IngestError, Result};
pub use pipeline::{Pipeline, PipelineResult};
