use serde::{Deserialize, Serialize};

/// Knobs for locating the wafer rim with the gradient Hough transform.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleOptions {
    /// Edge threshold relative to the strongest gradient (0..1).
    pub edge_rel_thresh: f32,
    /// Smallest radius searched, as a fraction of `min(w, h) / 2`.
    pub min_radius_frac: f32,
    /// Largest radius searched, as a fraction of `min(w, h) / 2`.
    pub max_radius_frac: f32,
    /// Centre accumulator cell size in pixels (>= 1).
    pub accumulator_step: usize,
    /// Minimum centre votes required to trust the Hough peak.
    pub min_center_votes: u32,
    /// Minimum rim support as a fraction of the circumference.
    pub min_support_frac: f32,
    /// Band (pixels) around the Hough radius used by the least-squares refit.
    pub refine_band_px: f32,
    /// Margin subtracted from `min(w, h) / 2` when detection fails.
    pub fallback_margin_px: f32,
}

impl Default for CircleOptions {
    fn default() -> Self {
        Self {
            edge_rel_thresh: 0.3,
            min_radius_frac: 0.25,
            max_radius_frac: 1.05,
            accumulator_step: 2,
            min_center_votes: 12,
            min_support_frac: 0.3,
            refine_band_px: 3.0,
            fallback_margin_px: 5.0,
        }
    }
}

/// Die-grid partitioning and per-die anomaly scoring.
///
/// The 0.95 radius cutoff and the ±1σ threshold are empirical and are what
/// downstream severity calibration was tuned against.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DieGridOptions {
    /// Grid rows (dies along y).
    pub rows: usize,
    /// Grid columns (dies along x).
    pub cols: usize,
    /// Dies whose centre lies beyond this fraction of the radius are background.
    pub background_radius_frac: f32,
    /// |z| above this marks a die as defective.
    pub z_threshold: f32,
    /// Floor applied to the wafer-wide standard deviation.
    pub std_epsilon: f32,
    pub circle: CircleOptions,
}

impl Default for DieGridOptions {
    fn default() -> Self {
        Self {
            rows: 26,
            cols: 33,
            background_radius_frac: 0.95,
            z_threshold: 1.0,
            std_epsilon: 1e-6,
            circle: CircleOptions::default(),
        }
    }
}
