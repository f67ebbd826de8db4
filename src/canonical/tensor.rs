//! Canonical NCHW tensor fed to every classifier.
//!
//! Layout is batch-of-one, channel-first: `[1, 3, H, W]`.
use super::diemap::DieMap;
use super::options::{CanonicalOptions, ResizeFilter};
use crate::types::InputKind;
use image::{imageops, RgbImage};
use ndarray::{Array4, ArrayView4};

#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalTensor {
    pub kind: InputKind,
    pub data: Array4<f32>,
}

impl CanonicalTensor {
    /// Unset tensor used before canonicalisation has run.
    pub fn empty() -> Self {
        Self {
            kind: InputKind::CategoricalMap,
            data: Array4::zeros((0, 0, 0, 0)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Full `[N, C, H, W]` shape.
    pub fn shape(&self) -> [usize; 4] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3]]
    }

    /// Per-sample `[C, H, W]` shape, compared against model expectations.
    pub fn chw(&self) -> [usize; 3] {
        let [_, c, h, w] = self.shape();
        [c, h, w]
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }
}

/// One-hot colour encode, resize, and scale a die-map into `[0, 1]`.
pub fn die_map_tensor(map: &DieMap, options: &CanonicalOptions) -> CanonicalTensor {
    let rgb = resize_rgb(&map.to_rgb(), options.die_map_size, options.die_map_filter);
    CanonicalTensor {
        kind: InputKind::CategoricalMap,
        data: to_nchw(&rgb, |_, v| v),
    }
}

/// Resize a photograph and apply per-channel mean/std normalisation.
pub fn photograph_tensor(photo: &RgbImage, options: &CanonicalOptions) -> CanonicalTensor {
    let rgb = resize_rgb(photo, options.photograph_size, options.photograph_filter);
    let mean = options.channel_mean;
    let std = options.channel_std;
    CanonicalTensor {
        kind: InputKind::Photograph,
        data: to_nchw(&rgb, |c, v| (v - mean[c]) / std[c]),
    }
}

fn resize_rgb(src: &RgbImage, [h, w]: [usize; 2], filter: ResizeFilter) -> RgbImage {
    let (w, h) = (w.max(1) as u32, h.max(1) as u32);
    if src.dimensions() == (w, h) {
        return src.clone();
    }
    imageops::resize(src, w, h, filter.filter_type())
}

fn to_nchw(rgb: &RgbImage, f: impl Fn(usize, f32) -> f32) -> Array4<f32> {
    let (w, h) = (rgb.width() as usize, rgb.height() as usize);
    let mut data = Array4::<f32>::zeros((1, 3, h, w));
    for (x, y, px) in rgb.enumerate_pixels() {
        for c in 0..3 {
            data[[0, c, y as usize, x as usize]] = f(c, px.0[c] as f32 / 255.0);
        }
    }
    data
}
