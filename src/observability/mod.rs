// Observability: metrics recorded across pipeline stages

pub mod metrics;

pub use metrics::{init, render};
