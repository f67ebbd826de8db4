//! Statistical process control over historical inspection results.
//!
//! - [`control`]: control limits, Western Electric rules, zones, summary.
//! - [`trend`]: lot-level dominant pattern analysis.
//!
//! Reports from [`InspectionPipeline`](crate::InspectionPipeline) feed both
//! through [`defect_rate_series`] and [`defect_distribution`].

pub mod control;
pub mod trend;

pub use control::{
    apply_western_electric_rules, control_limits, summarize, ControlLimits, PointAnalysis,
    ProcessStability, RuleSeverity, SpcPoint, SpcSummary, WesternElectricRule, Zone,
};
pub use trend::{analyze_lot_trend, pattern_name, TrendAnalysis, TrendVerdict};

use crate::pipeline::InspectionReport;
use std::collections::BTreeMap;

/// Default chart width in standard deviations.
pub const DEFAULT_SIGMA: f64 = 3.0;

/// Percentage of defective wafers per consecutive window of `window` reports.
/// The last window may be shorter. A zero window is treated as one.
pub fn defect_rate_series(reports: &[InspectionReport], window: usize) -> Vec<SpcPoint> {
    let window = window.max(1);
    reports
        .chunks(window)
        .enumerate()
        .map(|(i, chunk)| {
            let defective = chunk.iter().filter(|r| r.has_defect).count();
            let first = i * window + 1;
            let last = first + chunk.len() - 1;
            SpcPoint::new(
                format!("wafers {first}-{last}"),
                defective as f64 / chunk.len() as f64 * 100.0,
            )
        })
        .collect()
}

/// Defect pattern counts across reports, keyed by [`pattern_name`]; clean
/// wafers are not counted.
pub fn defect_distribution(reports: &[InspectionReport]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for report in reports.iter().filter(|r| r.has_defect) {
        *counts.entry(pattern_name(&report.predicted_class)).or_insert(0) += 1;
    }
    counts
}
