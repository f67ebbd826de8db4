#![doc = include_str!("../README.md")]

// Pipeline stages
pub mod analysis;
pub mod canonical;
pub mod ensemble;
pub mod explain;
pub mod model;
pub mod pipeline;
pub mod validation;
pub mod wafer;

// Supporting modules
pub mod config;
pub mod diagnostics;
pub mod edges;
pub mod error;
pub mod image;
pub mod spc;
pub mod types;

// --- High-level re-exports -------------------------------------------------

// Main entry points: pipeline + report.
pub use crate::pipeline::{InspectionPipeline, InspectionReport, PipelineParams};

// Errors.
pub use crate::error::{InputError, InspectError, ModelError, Result};

// Shared vocabulary.
pub use crate::explain::AlertTier;
pub use crate::types::{InputKind, Recommendation, Severity};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use wafer_inspector::prelude::*;
/// use std::path::Path;
///
/// # fn main() -> wafer_inspector::Result<()> {
/// let (manifests, _skipped) = load_manifests(&["models/diemap.json".into()]);
/// let pipeline = InspectionPipeline::new(PipelineParams::default(), ModelRunner::new(manifests));
///
/// let report = pipeline.inspect(Path::new("wafer.npy"))?;
/// println!("{} severity={} alert={:?}", report.predicted_class, report.severity, report.alert_tier);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::canonical::{DieMap, RawInput};
    pub use crate::model::{load_manifests, ModelRunner};
    pub use crate::types::DieState;
    pub use crate::{AlertTier, InspectionPipeline, InspectionReport, PipelineParams, Severity};
}
