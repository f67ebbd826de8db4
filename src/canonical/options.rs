use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Interpolation used when resizing into the canonical resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    Bicubic,
}

impl ResizeFilter {
    pub(crate) fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
        }
    }
}

/// Canonical tensor geometry and photograph normalisation.
///
/// The per-channel mean/std must match what the whole-image classifier was
/// trained with; a mismatch degrades accuracy without any error.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalOptions {
    /// Die-map tensor resolution `[height, width]`.
    pub die_map_size: [usize; 2],
    pub die_map_filter: ResizeFilter,
    /// Photograph tensor resolution `[height, width]`.
    pub photograph_size: [usize; 2],
    pub photograph_filter: ResizeFilter,
    pub channel_mean: [f32; 3],
    pub channel_std: [f32; 3],
}

impl Default for CanonicalOptions {
    fn default() -> Self {
        Self {
            die_map_size: [56, 56],
            die_map_filter: ResizeFilter::Bicubic,
            photograph_size: [224, 224],
            photograph_filter: ResizeFilter::Bilinear,
            channel_mean: [0.485, 0.456, 0.406],
            channel_std: [0.229, 0.224, 0.225],
        }
    }
}
