//! Parameter types configuring the inspection stages.
//!
//! Every threshold is configuration, including the empirically chosen
//! die-grid constants (0.95 radius cutoff, ±1σ), which downstream severity
//! calibration depends on. Defaults reproduce the reference behaviour.
use crate::analysis::AnalysisParams;
use crate::canonical::CanonicalOptions;
use crate::validation::ValidationParams;
use crate::wafer::DieGridOptions;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// Canonical tensor sizes and photograph normalisation.
    pub canonical: CanonicalOptions,
    /// Die grid and wafer boundary detection for photographs.
    pub die_grid: DieGridOptions,
    /// Significance, consistency and severity thresholds.
    pub analysis: AnalysisParams,
    /// Acceptance criteria and retry cap.
    pub validation: ValidationParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let params: PipelineParams = serde_json::from_str(
            r#"{ "validation": { "max_attempts": 5 }, "die_grid": { "z_threshold": 1.5 } }"#,
        )
        .unwrap();
        assert_eq!(params.validation.max_attempts, 5);
        assert_eq!(params.validation.min_confidence, 0.25);
        assert_eq!(params.die_grid.z_threshold, 1.5);
        assert_eq!(params.die_grid.rows, 26);
        assert_eq!(params.die_grid.cols, 33);
        assert_eq!(params.canonical.die_map_size, [56, 56]);
        assert_eq!(params.analysis.pass_threshold, 0.6);
    }
}
