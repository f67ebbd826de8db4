//! Edge utilities for locating the wafer rim: Sobel gradients and sparse
//! edge points above a relative magnitude threshold.
//!
//! Borders are handled by clamping indices (replicate). Outputs stay simple
//! so the circle detector can vote directly from them.

pub mod grad;

pub use grad::{edge_points, sobel_gradients, EdgePoint, Grad};
