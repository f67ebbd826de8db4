//! Diagnostics attached to every inspection report.
//!
//! Currently a per-stage timing trace; retries show up as repeated stages
//! with an `#attempt` suffix.

pub mod timing;

pub use timing::{StageTiming, TimingBreakdown};
