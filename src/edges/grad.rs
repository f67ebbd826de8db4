//! Sobel image gradients with magnitude, plus sparse edge-point extraction.
//!
//! - Convolves the 3×3 Sobel pair (`X` and `Y`) with border clamping.
//! - Outputs per‑pixel `gx`, `gy`, `mag = sqrt(gx^2+gy^2)`.
//!
//! Complexity: O(W·H) per pass; memory: three float buffers.
use crate::image::{ImageF32, ImageView, ImageViewMut};

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

/// Per‑pixel gradient buffers.
#[derive(Clone, Debug)]
pub struct Grad {
    /// Horizontal derivative (convolution with kernel X)
    pub gx: ImageF32,
    /// Vertical derivative (convolution with kernel Y)
    pub gy: ImageF32,
    /// Euclidean magnitude per pixel: `sqrt(gx^2 + gy^2)`
    pub mag: ImageF32,
}

/// A pixel whose gradient magnitude passed the edge threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePoint {
    pub x: f32,
    pub y: f32,
    /// Unit gradient direction (points from dark to bright).
    pub dir: [f32; 2],
    pub magnitude: f32,
}

fn gradients_with_kernels(l: &ImageF32, kernel_x: &Kernel3, kernel_y: &Kernel3) -> Grad {
    let w = l.w;
    let h = l.h;
    let mut gx = ImageF32::new(w, h);
    let mut gy = ImageF32::new(w, h);
    let mut mag = ImageF32::new(w, h);

    if w == 0 || h == 0 {
        return Grad { gx, gy, mag };
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [l.row(y_idx[0]), l.row(y_idx[1]), l.row(y_idx[2])];
        let out_gx = gx.row_mut(y);
        let out_gy = gy.row_mut(y);
        let out_mag = mag.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, yy_row) in rows.iter().enumerate() {
                let kx_row = &kernel_x[ky];
                let ky_row = &kernel_y[ky];
                sum_x += yy_row[x_idx[0]] * kx_row[0]
                    + yy_row[x_idx[1]] * kx_row[1]
                    + yy_row[x_idx[2]] * kx_row[2];
                sum_y += yy_row[x_idx[0]] * ky_row[0]
                    + yy_row[x_idx[1]] * ky_row[1]
                    + yy_row[x_idx[2]] * ky_row[2];
            }

            out_gx[x] = sum_x;
            out_gy[x] = sum_y;
            out_mag[x] = (sum_x * sum_x + sum_y * sum_y).sqrt();
        }
    }

    Grad { gx, gy, mag }
}

/// Compute Sobel gradients on a single‑channel float image.
pub fn sobel_gradients(l: &ImageF32) -> Grad {
    gradients_with_kernels(l, &SOBEL_KERNEL_X, &SOBEL_KERNEL_Y)
}

/// Collect edge points whose magnitude exceeds `rel_thresh × max(mag)`.
///
/// Returns an empty list on flat images (max magnitude of zero).
pub fn edge_points(grad: &Grad, rel_thresh: f32) -> Vec<EdgePoint> {
    let max_mag = grad
        .mag
        .rows()
        .flat_map(|r| r.iter().copied())
        .fold(0.0f32, f32::max);
    if max_mag <= 0.0 {
        return Vec::new();
    }
    let thresh = max_mag * rel_thresh.clamp(0.0, 1.0);
    let mut points = Vec::new();
    for y in 0..grad.mag.h {
        let mag_row = grad.mag.row(y);
        let gx_row = grad.gx.row(y);
        let gy_row = grad.gy.row(y);
        for x in 0..grad.mag.w {
            let m = mag_row[x];
            if m <= thresh || m <= 0.0 {
                continue;
            }
            points.push(EdgePoint {
                x: x as f32,
                y: y as f32,
                dir: [gx_row[x] / m, gy_row[x] / m],
                magnitude: m,
            });
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_image(width: usize, height: usize, split_x: usize) -> ImageF32 {
        let mut img = ImageF32::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = if x < split_x { 0.0 } else { 255.0 };
                img.set(x, y, v);
            }
        }
        img
    }

    #[test]
    fn sobel_responds_to_vertical_step() {
        let img = step_image(16, 8, 8);
        let grad = sobel_gradients(&img);
        assert!(grad.gx.get(8, 4) > 0.0);
        assert_eq!(grad.gy.get(8, 4), 0.0);
        assert_eq!(grad.mag.get(2, 4), 0.0);
    }

    #[test]
    fn edge_points_follow_the_step_and_point_to_bright_side() {
        let img = step_image(16, 8, 8);
        let pts = edge_points(&sobel_gradients(&img), 0.5);
        assert!(!pts.is_empty());
        for p in &pts {
            assert!(p.x == 7.0 || p.x == 8.0, "unexpected edge at x={}", p.x);
            assert!(p.dir[0] > 0.99);
        }
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = ImageF32::new(8, 8);
        assert!(edge_points(&sobel_gradients(&img), 0.1).is_empty());
    }
}
