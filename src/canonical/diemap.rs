//! Categorical die-map: a 2D grid of {background, normal, defect} states.
//!
//! Die-maps arrive as `.npy` arrays. Integer and float dtypes are accepted as
//! long as every value is one of the three legal codes `0`, `1`, `2`.
use crate::error::InputError;
use crate::types::DieState;
use image::{Rgb, RgbImage};
use ndarray::{Array2, ArrayD, Ix2};
use ndarray_npy::{ReadNpyError, ReadNpyExt, ReadableElement, WriteNpyExt};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Occurrences of each die state on a map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieCounts {
    pub background: usize,
    pub normal: usize,
    pub defect: usize,
}

impl DieCounts {
    pub fn total(&self) -> usize {
        self.background + self.normal + self.defect
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DieMap {
    grid: Array2<DieState>,
}

impl DieMap {
    pub fn new(grid: Array2<DieState>) -> Self {
        Self { grid }
    }

    /// A `rows × cols` map with every die set to `state`.
    pub fn filled(rows: usize, cols: usize, state: DieState) -> Self {
        Self::new(Array2::from_elem((rows, cols), state))
    }

    /// Build from raw codes, rejecting anything outside {0, 1, 2}.
    pub fn from_codes(codes: &Array2<i64>) -> Result<Self, String> {
        let mut grid = Array2::from_elem(codes.raw_dim(), DieState::Background);
        for ((r, c), &v) in codes.indexed_iter() {
            grid[[r, c]] = DieState::from_value(v)
                .ok_or_else(|| format!("illegal die value {v} at ({r}, {c})"))?;
        }
        Ok(Self::new(grid))
    }

    pub fn rows(&self) -> usize {
        self.grid.nrows()
    }

    pub fn cols(&self) -> usize {
        self.grid.ncols()
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows(), self.cols()]
    }

    pub fn get(&self, row: usize, col: usize) -> DieState {
        self.grid[[row, col]]
    }

    pub fn set(&mut self, row: usize, col: usize, state: DieState) {
        self.grid[[row, col]] = state;
    }

    pub fn grid(&self) -> &Array2<DieState> {
        &self.grid
    }

    pub fn counts(&self) -> DieCounts {
        let mut counts = DieCounts::default();
        for state in self.grid.iter() {
            match state {
                DieState::Background => counts.background += 1,
                DieState::Normal => counts.normal += 1,
                DieState::Defect => counts.defect += 1,
            }
        }
        counts
    }

    /// One-hot colour encoding: each state lights its own channel at 255.
    pub fn to_rgb(&self) -> RgbImage {
        let mut rgb = RgbImage::new(self.cols() as u32, self.rows() as u32);
        for ((r, c), state) in self.grid.indexed_iter() {
            let mut px = [0u8; 3];
            px[state.channel()] = 255;
            rgb.put_pixel(c as u32, r as u32, Rgb(px));
        }
        rgb
    }

    pub fn to_codes(&self) -> Array2<i64> {
        self.grid.mapv(|s| s as i64)
    }

    /// Write the map as an `int64` `.npy` array.
    pub fn write_npy(&self, path: &Path) -> Result<(), String> {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create {}: {e}", path.display()))?;
        self.to_codes()
            .write_npy(BufWriter::new(file))
            .map_err(|e| format!("Failed to write npy {}: {e}", path.display()))
    }
}

/// Load a die-map from a `.npy` file.
pub fn load_npy(path: &Path) -> Result<DieMap, InputError> {
    if !path.exists() {
        return Err(InputError::InputNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|e| InputError::decode(path, e.to_string()))?;
    decode_npy(&bytes).map_err(|reason| InputError::decode(path, reason))
}

/// Decode `.npy` bytes into a die-map.
pub fn decode_npy(bytes: &[u8]) -> Result<DieMap, String> {
    let codes = read_codes(bytes)?;
    let ndim = codes.ndim();
    let codes = codes
        .into_dimensionality::<Ix2>()
        .map_err(|_| format!("expected a 2-D array, got {ndim} dimensions"))?;
    if codes.is_empty() {
        return Err("die-map is empty".to_string());
    }
    DieMap::from_codes(&codes)
}

fn read_codes(bytes: &[u8]) -> Result<ArrayD<i64>, String> {
    macro_rules! try_int {
        ($($t:ty),*) => {$(
            if let Some(arr) = try_read::<$t>(bytes, |v| i64::try_from(v).ok())? {
                return Ok(arr);
            }
        )*};
    }
    try_int!(i64, i32, i16, i8, u8, u16, u32, u64);

    let integral = |v: f64| (v.is_finite() && v.fract() == 0.0).then_some(v as i64);
    if let Some(arr) = try_read::<f64>(bytes, integral)? {
        return Ok(arr);
    }
    if let Some(arr) = try_read::<f32>(bytes, |v| integral(v as f64))? {
        return Ok(arr);
    }
    Err("unsupported dtype (expected integer or float codes)".to_string())
}

/// `Ok(None)` when the file holds a different dtype.
fn try_read<T>(
    bytes: &[u8],
    convert: impl Fn(T) -> Option<i64>,
) -> Result<Option<ArrayD<i64>>, String>
where
    T: ReadableElement + Copy,
{
    match ArrayD::<T>::read_npy(bytes) {
        Ok(arr) => {
            let mut out = ArrayD::<i64>::zeros(arr.raw_dim());
            for (dst, &src) in out.iter_mut().zip(arr.iter()) {
                // Sentinel outside {0,1,2}; reported by `DieMap::from_codes`.
                *dst = convert(src).unwrap_or(-1);
            }
            Ok(Some(out))
        }
        Err(ReadNpyError::WrongDescriptor(_)) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}
