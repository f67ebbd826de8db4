//! Partition a photographed wafer into a fixed die grid and score each die.
//!
//! The grid spans the bounding box of the detected wafer circle. A die whose
//! centre lies beyond `background_radius_frac × radius` is background;
//! otherwise its mean intensity is compared with the wafer-wide mean/std
//! (computed inside the circular mask) and `|z| > z_threshold` marks it as a
//! defect.
use super::circle::{detect_wafer_circle, WaferCircle};
use super::options::DieGridOptions;
use crate::canonical::DieMap;
use crate::image::{ImageF32, ImageView};
use crate::types::DieState;
use image::GrayImage;
use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Output of the die-grid extractor.
#[derive(Clone, Debug)]
pub struct DieGridResult {
    pub map: DieMap,
    pub circle: WaferCircle,
    pub stats: IntensityStats,
}

/// Wafer-wide intensity statistics inside the circular mask.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntensityStats {
    pub mean: f32,
    /// Population standard deviation, floored at the configured epsilon.
    pub std: f32,
    pub pixels: usize,
}

/// Converts a grayscale wafer photograph into a categorical die map.
#[derive(Clone, Debug, Default)]
pub struct DieGridExtractor {
    options: DieGridOptions,
}

impl DieGridExtractor {
    pub fn new(options: DieGridOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DieGridOptions {
        &self.options
    }

    /// Detect the wafer boundary and score every die of the grid.
    pub fn extract(&self, gray: &GrayImage) -> DieGridResult {
        let image = ImageF32::from_luma(gray);
        let circle = detect_wafer_circle(&image, &self.options.circle);
        self.extract_with_circle(&image, circle)
    }

    /// Score the die grid against a known wafer boundary.
    pub fn extract_with_circle(&self, image: &ImageF32, circle: WaferCircle) -> DieGridResult {
        let opts = &self.options;
        let stats = masked_stats(image, &circle, opts.std_epsilon);
        let rows = opts.rows.max(1);
        let cols = opts.cols.max(1);

        let x0 = circle.cx - circle.radius;
        let y0 = circle.cy - circle.radius;
        let die_w = 2.0 * circle.radius / cols as f32;
        let die_h = 2.0 * circle.radius / rows as f32;
        let cutoff = opts.background_radius_frac * circle.radius;

        let mut grid = Array2::from_elem((rows, cols), DieState::Background);
        for r in 0..rows {
            for c in 0..cols {
                let centre_x = x0 + (c as f32 + 0.5) * die_w;
                let centre_y = y0 + (r as f32 + 0.5) * die_h;
                let dist = ((centre_x - circle.cx).powi(2) + (centre_y - circle.cy).powi(2)).sqrt();
                if dist > cutoff {
                    continue;
                }
                let bounds = die_bounds(
                    x0 + c as f32 * die_w,
                    y0 + r as f32 * die_h,
                    die_w,
                    die_h,
                    image.w,
                    image.h,
                );
                let Some((xs, xe, ys, ye)) = bounds else {
                    continue;
                };
                let mean = region_mean(image, xs, xe, ys, ye);
                let z = (mean - stats.mean) / stats.std;
                grid[[r, c]] = if z.abs() > opts.z_threshold {
                    DieState::Defect
                } else {
                    DieState::Normal
                };
            }
        }

        let map = DieMap::new(grid);
        let counts = map.counts();
        debug!(
            "die grid {}x{}: background={} normal={} defect={} (mean={:.2} std={:.2})",
            rows, cols, counts.background, counts.normal, counts.defect, stats.mean, stats.std
        );
        DieGridResult { map, circle, stats }
    }
}

fn masked_stats(image: &ImageF32, circle: &WaferCircle, eps: f32) -> IntensityStats {
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let mut n = 0usize;
    for y in 0..image.h {
        let row = image.row(y);
        for (x, &v) in row.iter().enumerate() {
            if !circle.contains(x as f32, y as f32) {
                continue;
            }
            let v = v as f64;
            sum += v;
            sum_sq += v * v;
            n += 1;
        }
    }
    if n == 0 {
        return IntensityStats {
            mean: 0.0,
            std: eps,
            pixels: 0,
        };
    }
    let mean = sum / n as f64;
    let var = (sum_sq / n as f64 - mean * mean).max(0.0);
    IntensityStats {
        mean: mean as f32,
        std: (var.sqrt() as f32).max(eps),
        pixels: n,
    }
}

/// Clamp a die rectangle to the image; `None` when nothing of it is visible.
fn die_bounds(
    left: f32,
    top: f32,
    die_w: f32,
    die_h: f32,
    width: usize,
    height: usize,
) -> Option<(usize, usize, usize, usize)> {
    let clamp = |v: f32, max: usize| -> usize { v.max(0.0).min(max as f32) as usize };
    let xs = clamp(left.floor(), width);
    let xe = clamp((left + die_w).ceil(), width);
    let ys = clamp(top.floor(), height);
    let ye = clamp((top + die_h).ceil(), height);
    (xs < xe && ys < ye).then_some((xs, xe, ys, ye))
}

fn region_mean(image: &ImageF32, xs: usize, xe: usize, ys: usize, ye: usize) -> f32 {
    let mut sum = 0.0f64;
    for y in ys..ye {
        sum += image.row(y)[xs..xe].iter().map(|&v| v as f64).sum::<f64>();
    }
    (sum / ((xe - xs) * (ye - ys)) as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wafer::circle::CircleSource;

    fn known_circle(cx: f32, cy: f32, radius: f32) -> WaferCircle {
        WaferCircle {
            cx,
            cy,
            radius,
            source: CircleSource::Detected,
            support: 1.0,
        }
    }

    #[test]
    fn uniform_wafer_has_no_defect_dies() {
        let mut img = ImageF32::new(100, 100);
        for v in img.data.iter_mut() {
            *v = 128.0;
        }
        let extractor = DieGridExtractor::default();
        let res = extractor.extract_with_circle(&img, known_circle(50.0, 50.0, 45.0));
        let counts = res.map.counts();
        assert_eq!(res.map.shape(), [26, 33]);
        assert_eq!(counts.defect, 0);
        assert!(counts.normal > 0);
        assert!(counts.background > 0);
        // Flat intensity: std is floored at epsilon, not zero.
        assert!(res.stats.std > 0.0);
    }

    #[test]
    fn corner_dies_are_background() {
        let img = ImageF32::new(66, 52);
        let extractor = DieGridExtractor::default();
        let res = extractor.extract_with_circle(&img, known_circle(33.0, 26.0, 26.0));
        assert_eq!(res.map.get(0, 0), DieState::Background);
        assert_eq!(res.map.get(25, 32), DieState::Background);
        assert_eq!(res.map.get(13, 16), DieState::Normal);
    }

    #[test]
    fn dark_blob_is_flagged_as_defect() {
        let mut img = ImageF32::new(132, 104);
        for y in 0..img.h {
            for x in 0..img.w {
                let v = if (60..72).contains(&x) && (46..58).contains(&y) {
                    10.0
                } else {
                    150.0
                };
                img.set(x, y, v);
            }
        }
        let extractor = DieGridExtractor::default();
        let res = extractor.extract_with_circle(&img, known_circle(66.0, 52.0, 52.0));
        let counts = res.map.counts();
        assert!(counts.defect > 0, "expected defect dies, got {counts:?}");
        // Die (13, 16) covers the image centre, which sits inside the blob.
        assert_eq!(res.map.get(13, 16), DieState::Defect);
        assert_eq!(res.map.get(5, 16), DieState::Normal);
    }
}
