//! Canonicalizer: turn a raw wafer input into the fixed-shape tensor every
//! classifier consumes, plus provenance describing where it came from.
//!
//! Paths per input kind
//! - Categorical die-map (`.npy`): count states, one-hot colour encode,
//!   resize to the die-map resolution, scale into `[0, 1]`.
//! - Photograph for a whole-image classifier: resize to the photograph
//!   resolution and apply per-channel mean/std normalisation.
//! - Photograph for die-grid classifiers: extract a die-map with
//!   [`DieGridExtractor`](crate::wafer::DieGridExtractor), then take the
//!   categorical path.
//!
//! Input errors (missing file, unsupported kind, corrupt data) are returned to
//! the caller; nothing here retries.

pub mod diemap;
pub mod options;
pub mod tensor;

pub use diemap::{decode_npy, load_npy, DieCounts, DieMap};
pub use options::{CanonicalOptions, ResizeFilter};
pub use tensor::{die_map_tensor, photograph_tensor, CanonicalTensor};

use crate::error::InputError;
use crate::image::io::load_rgb_image;
use crate::types::InputKind;
use crate::wafer::{DieGridExtractor, DieGridOptions, IntensityStats, WaferCircle};
use image::{imageops, RgbImage};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Decide the input kind from the file extension.
pub fn sniff_kind(path: &Path) -> Result<InputKind, InputError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("npy") => Ok(InputKind::CategoricalMap),
        Some("png" | "jpg" | "jpeg") => Ok(InputKind::Photograph),
        _ => Err(InputError::UnsupportedInputKind(path.to_path_buf())),
    }
}

/// Decoded raw input, one variant per kind.
#[derive(Clone, Debug)]
pub enum RawInput {
    CategoricalMap(DieMap),
    Photograph(RgbImage),
}

impl RawInput {
    /// Sniff, then decode a file from disk.
    pub fn load(path: &Path) -> Result<Self, InputError> {
        match sniff_kind(path)? {
            InputKind::CategoricalMap => load_npy(path).map(RawInput::CategoricalMap),
            InputKind::Photograph => load_rgb_image(path).map(RawInput::Photograph),
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            RawInput::CategoricalMap(_) => InputKind::CategoricalMap,
            RawInput::Photograph(_) => InputKind::Photograph,
        }
    }

    /// `[rows, cols]` for die-maps, `[height, width, 3]` for photographs.
    pub fn original_shape(&self) -> Vec<usize> {
        match self {
            RawInput::CategoricalMap(map) => map.shape().to_vec(),
            RawInput::Photograph(img) => vec![img.height() as usize, img.width() as usize, 3],
        }
    }
}

/// Which classifier family a photograph is prepared for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotographRoute {
    #[default]
    WholeImage,
    DieGrid,
}

/// Where a canonical tensor came from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub original_shape: Vec<usize>,
    /// Known for die-maps and for photographs routed through the die grid.
    pub counts: Option<DieCounts>,
    pub tensor_shape: [usize; 4],
    pub route: Option<PhotographRoute>,
    pub wafer_circle: Option<WaferCircle>,
    pub intensity: Option<IntensityStats>,
}

/// Canonicalizer output.
#[derive(Clone, Debug)]
pub struct CanonicalInput {
    pub source_kind: InputKind,
    pub tensor: CanonicalTensor,
    pub provenance: Provenance,
}

#[derive(Clone, Debug, Default)]
pub struct Canonicalizer {
    options: CanonicalOptions,
    extractor: DieGridExtractor,
}

impl Canonicalizer {
    pub fn new(options: CanonicalOptions, die_grid: DieGridOptions) -> Self {
        Self {
            options,
            extractor: DieGridExtractor::new(die_grid),
        }
    }

    pub fn options(&self) -> &CanonicalOptions {
        &self.options
    }

    /// Canonicalise decoded input. `route` only matters for photographs.
    pub fn canonicalize(&self, raw: &RawInput, route: PhotographRoute) -> CanonicalInput {
        let mut provenance = Provenance {
            original_shape: raw.original_shape(),
            ..Provenance::default()
        };
        let tensor = match raw {
            RawInput::CategoricalMap(map) => {
                provenance.counts = Some(map.counts());
                die_map_tensor(map, &self.options)
            }
            RawInput::Photograph(photo) => {
                provenance.route = Some(route);
                match route {
                    PhotographRoute::WholeImage => photograph_tensor(photo, &self.options),
                    PhotographRoute::DieGrid => {
                        let grid = self.extractor.extract(&imageops::grayscale(photo));
                        provenance.counts = Some(grid.map.counts());
                        provenance.wafer_circle = Some(grid.circle);
                        provenance.intensity = Some(grid.stats);
                        die_map_tensor(&grid.map, &self.options)
                    }
                }
            }
        };
        provenance.tensor_shape = tensor.shape();
        debug!(
            "canonicalized {} input {:?} -> tensor {:?}",
            raw.kind(),
            provenance.original_shape,
            provenance.tensor_shape
        );
        CanonicalInput {
            source_kind: raw.kind(),
            tensor,
            provenance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DieState;
    use image::Rgb;

    #[test]
    fn sniffs_by_extension() {
        assert_eq!(
            sniff_kind(Path::new("a/wafer.NPY")).unwrap(),
            InputKind::CategoricalMap
        );
        assert_eq!(
            sniff_kind(Path::new("wafer.jpeg")).unwrap(),
            InputKind::Photograph
        );
        assert!(matches!(
            sniff_kind(Path::new("wafer.csv")),
            Err(InputError::UnsupportedInputKind(_))
        ));
        assert!(matches!(
            sniff_kind(Path::new("wafer")),
            Err(InputError::UnsupportedInputKind(_))
        ));
    }

    #[test]
    fn die_map_provenance_carries_counts() {
        let mut map = DieMap::filled(10, 12, DieState::Normal);
        map.set(0, 0, DieState::Background);
        map.set(5, 5, DieState::Defect);
        let out = Canonicalizer::default().canonicalize(
            &RawInput::CategoricalMap(map),
            PhotographRoute::WholeImage,
        );
        assert_eq!(out.source_kind, InputKind::CategoricalMap);
        assert_eq!(out.provenance.original_shape, vec![10, 12]);
        assert_eq!(out.provenance.tensor_shape, [1, 3, 56, 56]);
        let counts = out.provenance.counts.unwrap();
        assert_eq!((counts.background, counts.normal, counts.defect), (1, 118, 1));
        assert!(out.provenance.route.is_none());
    }

    #[test]
    fn photograph_routes_produce_matching_tensors() {
        let photo = RgbImage::from_pixel(64, 48, Rgb([90, 90, 90]));
        let canon = Canonicalizer::default();

        let whole = canon.canonicalize(&RawInput::Photograph(photo.clone()), PhotographRoute::WholeImage);
        assert_eq!(whole.tensor.kind, InputKind::Photograph);
        assert_eq!(whole.tensor.chw(), [3, 224, 224]);
        assert!(whole.provenance.counts.is_none());

        let grid = canon.canonicalize(&RawInput::Photograph(photo), PhotographRoute::DieGrid);
        assert_eq!(grid.source_kind, InputKind::Photograph);
        assert_eq!(grid.tensor.kind, InputKind::CategoricalMap);
        assert_eq!(grid.tensor.chw(), [3, 56, 56]);
        assert_eq!(grid.provenance.counts.unwrap().total(), 26 * 33);
        assert!(grid.provenance.wafer_circle.is_some());
        assert_eq!(grid.provenance.original_shape, vec![48, 64, 3]);
    }
}
