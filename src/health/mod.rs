//! Fleet health: passive staleness detection and aggregate stats

pub mod staleness;
pub mod stats;

pub use staleness::{StalenessDetector, STALENESS_CONFIDENCE};
pub use stats::{StatsAggregator, StatsSnapshot};
