//! Wafer-boundary detection and die-grid extraction for photographed wafers.
//!
//! Modules
//! - [`circle`] – gradient Hough circle transform with least-squares polish
//!   and a deterministic centred fallback.
//! - [`diegrid`] – fixed-grid partition of the wafer and per-die z-score
//!   anomaly scoring against the wafer-wide intensity statistics.
//! - [`options`] – knobs for both stages.

pub mod circle;
pub mod diegrid;
pub mod options;

pub use circle::{detect_wafer_circle, CircleSource, WaferCircle};
pub use diegrid::{DieGridExtractor, DieGridResult, IntensityStats};
pub use options::{CircleOptions, DieGridOptions};
