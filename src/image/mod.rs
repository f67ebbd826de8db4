//! Float image buffer used by the die-grid extractor, plus decoding helpers
//! for photographed wafers.

pub mod f32;
pub mod io;
pub mod traits;

pub use self::f32::ImageF32;
pub use self::traits::{ImageView, ImageViewMut, Rows};
