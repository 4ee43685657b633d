pub mod ports;
pub mod load_use_case;
pub mod stats_use_case;

pub use load_use_case::{BatchLoader, LoadOutcome};
pub use ports::Destination;
pub use stats_use_case::StatsReporter;
