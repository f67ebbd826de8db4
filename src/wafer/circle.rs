//! Wafer rim detection via a gradient Hough transform.
//!
//! 1) Sobel gradients on the grayscale photograph; keep edge points above a
//!    relative magnitude threshold.
//! 2) Each edge point votes for candidate centres along its gradient line
//!    (both polarities) for every radius in the search range. Votes land in a
//!    coarse accumulator of `accumulator_step` pixels per cell.
//! 3) The accumulator peak gives the centre; a 1-px histogram of edge-point
//!    distances to that centre gives the radius.
//! 4) An algebraic (Kåsa) least-squares fit over the edge points near the
//!    Hough radius polishes centre and radius.
//!
//! Detection never fails from the caller's point of view: when any stage
//! lacks support, [`detect_wafer_circle`] falls back to the image centre with
//! `radius = min(w, h) / 2 - margin`.
use super::options::CircleOptions;
use crate::edges::{edge_points, sobel_gradients, EdgePoint};
use crate::image::ImageF32;
use log::{debug, warn};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How the wafer boundary estimate was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircleSource {
    Detected,
    Fallback,
}

/// Circular wafer boundary in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaferCircle {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    pub source: CircleSource,
    /// Rim support as a fraction of the circumference (0 for fallback).
    pub support: f32,
}

impl WaferCircle {
    /// Deterministic boundary used when detection fails.
    pub fn fallback(width: usize, height: usize, margin_px: f32) -> Self {
        let half_min = width.min(height) as f32 * 0.5;
        Self {
            cx: width as f32 * 0.5,
            cy: height as f32 * 0.5,
            radius: (half_min - margin_px).max(1.0),
            source: CircleSource::Fallback,
            support: 0.0,
        }
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let dx = x - self.cx;
        let dy = y - self.cy;
        dx * dx + dy * dy <= self.radius * self.radius
    }
}

/// Locate the wafer boundary, falling back to a centred estimate.
pub fn detect_wafer_circle(image: &ImageF32, options: &CircleOptions) -> WaferCircle {
    match hough_circle(image, options) {
        Some(circle) => {
            debug!(
                "wafer circle detected cx={:.1} cy={:.1} r={:.1} support={:.2}",
                circle.cx, circle.cy, circle.radius, circle.support
            );
            circle
        }
        None => {
            let circle = WaferCircle::fallback(image.w, image.h, options.fallback_margin_px);
            warn!(
                "wafer circle detection failed on {}x{} image; falling back to centre r={:.1}",
                image.w, image.h, circle.radius
            );
            circle
        }
    }
}

fn hough_circle(image: &ImageF32, options: &CircleOptions) -> Option<WaferCircle> {
    if image.w < 8 || image.h < 8 {
        return None;
    }
    let grad = sobel_gradients(image);
    let points = edge_points(&grad, options.edge_rel_thresh);
    if points.is_empty() {
        return None;
    }

    let half_min = image.w.min(image.h) as f32 * 0.5;
    let r_min = (options.min_radius_frac * half_min).max(2.0);
    let r_max = options.max_radius_frac * half_min;
    if !(r_max > r_min) {
        return None;
    }

    let (cx, cy, votes) = vote_centre(&points, image.w, image.h, r_min, r_max, options)?;
    if votes < options.min_center_votes {
        debug!("hough centre peak too weak: votes={votes}");
        return None;
    }

    let (radius, support) = radius_from_histogram(&points, cx, cy, r_min, r_max)?;
    let circumference = 2.0 * std::f32::consts::PI * radius;
    let support_frac = support as f32 / circumference.max(1.0);
    if support_frac < options.min_support_frac {
        debug!("hough radius support too weak: r={radius:.1} support={support_frac:.2}");
        return None;
    }

    let (cx, cy, radius) = refine_circle(&points, cx, cy, radius, options.refine_band_px)
        .unwrap_or((cx, cy, radius));

    Some(WaferCircle {
        cx,
        cy,
        radius,
        source: CircleSource::Detected,
        support: support_frac.min(1.0),
    })
}

fn vote_centre(
    points: &[EdgePoint],
    width: usize,
    height: usize,
    r_min: f32,
    r_max: f32,
    options: &CircleOptions,
) -> Option<(f32, f32, u32)> {
    let step = options.accumulator_step.max(1) as f32;
    let aw = (width as f32 / step).ceil() as usize;
    let ah = (height as f32 / step).ceil() as usize;
    if aw == 0 || ah == 0 {
        return None;
    }

    let acc = points
        .par_iter()
        .fold(
            || vec![0u32; aw * ah],
            |mut acc, p| {
                for sign in [-1.0f32, 1.0] {
                    let mut r = r_min;
                    while r <= r_max {
                        let x = p.x + sign * r * p.dir[0];
                        let y = p.y + sign * r * p.dir[1];
                        if x >= 0.0 && y >= 0.0 {
                            let ix = (x / step) as usize;
                            let iy = (y / step) as usize;
                            if ix < aw && iy < ah {
                                acc[iy * aw + ix] += 1;
                            }
                        }
                        r += step;
                    }
                }
                acc
            },
        )
        .reduce(
            || vec![0u32; aw * ah],
            |mut a, b| {
                for (dst, src) in a.iter_mut().zip(b) {
                    *dst += src;
                }
                a
            },
        );

    let (best, votes) = acc
        .iter()
        .enumerate()
        .max_by_key(|&(i, &v)| (v, std::cmp::Reverse(i)))
        .map(|(i, &v)| (i, v))?;
    let ix = best % aw;
    let iy = best / aw;
    Some((
        (ix as f32 + 0.5) * step,
        (iy as f32 + 0.5) * step,
        votes,
    ))
}

fn radius_from_histogram(
    points: &[EdgePoint],
    cx: f32,
    cy: f32,
    r_min: f32,
    r_max: f32,
) -> Option<(f32, usize)> {
    let lo = r_min.floor() as usize;
    let hi = r_max.ceil() as usize;
    let mut bins = vec![0usize; hi - lo + 1];
    for p in points {
        let d = ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt();
        let bin = d.round() as usize;
        if bin >= lo && bin <= hi {
            bins[bin - lo] += 1;
        }
    }
    // Support over a 3-bin window absorbs the rim's pixel thickness.
    let mut best: Option<(usize, usize)> = None;
    for i in 0..bins.len() {
        let window = bins[i.saturating_sub(1)..(i + 2).min(bins.len())]
            .iter()
            .sum::<usize>();
        if best.map_or(true, |(_, s)| window > s) {
            best = Some((i, window));
        }
    }
    let (idx, support) = best?;
    if support == 0 {
        return None;
    }
    Some(((idx + lo) as f32, support))
}

/// Kåsa algebraic circle fit on points within `band` of the current radius.
///
/// Solves `x² + y² + D·x + E·y + F = 0` in the least-squares sense through
/// the 3×3 normal equations.
fn refine_circle(
    points: &[EdgePoint],
    cx: f32,
    cy: f32,
    radius: f32,
    band: f32,
) -> Option<(f32, f32, f32)> {
    let mut ata = Matrix3::<f64>::zeros();
    let mut atb = Vector3::<f64>::zeros();
    let mut n = 0usize;
    for p in points {
        let d = ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt();
        if (d - radius).abs() > band {
            continue;
        }
        let row = Vector3::new(p.x as f64, p.y as f64, 1.0);
        let rhs = -((p.x as f64).powi(2) + (p.y as f64).powi(2));
        ata += row * row.transpose();
        atb += row * rhs;
        n += 1;
    }
    if n < 8 {
        return None;
    }
    let sol = ata.lu().solve(&atb)?;
    let fx = -0.5 * sol[0];
    let fy = -0.5 * sol[1];
    let r2 = fx * fx + fy * fy - sol[2];
    if !(r2 > 0.0) {
        return None;
    }
    let (fx, fy, fr) = (fx as f32, fy as f32, r2.sqrt() as f32);
    let shift = ((fx - cx).powi(2) + (fy - cy).powi(2)).sqrt();
    if !fr.is_finite() || shift > 2.0 * band || (fr - radius).abs() > 2.0 * band {
        return None;
    }
    Some((fx, fy, fr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disk(width: usize, height: usize, cx: f32, cy: f32, r: f32) -> ImageF32 {
        let mut img = ImageF32::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                img.set(x, y, if d <= r { 180.0 } else { 20.0 });
            }
        }
        img
    }

    #[test]
    fn detects_offset_disk() {
        let img = disk(200, 160, 104.0, 78.0, 60.0);
        let circle = detect_wafer_circle(&img, &CircleOptions::default());
        assert_eq!(circle.source, CircleSource::Detected);
        assert!((circle.cx - 104.0).abs() < 2.5, "cx={}", circle.cx);
        assert!((circle.cy - 78.0).abs() < 2.5, "cy={}", circle.cy);
        assert!((circle.radius - 60.0).abs() < 2.5, "r={}", circle.radius);
    }

    #[test]
    fn flat_image_falls_back_to_centre() {
        let img = ImageF32::new(120, 100);
        let circle = detect_wafer_circle(&img, &CircleOptions::default());
        assert_eq!(circle.source, CircleSource::Fallback);
        assert_eq!((circle.cx, circle.cy), (60.0, 50.0));
        assert_eq!(circle.radius, 45.0);
    }

    #[test]
    fn fallback_radius_never_collapses() {
        let circle = WaferCircle::fallback(4, 4, 5.0);
        assert_eq!(circle.radius, 1.0);
        assert!(circle.contains(2.0, 2.0));
    }
}
