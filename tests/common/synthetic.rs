use image::{Rgb, RgbImage};
use wafer_inspector::canonical::DieMap;
use wafer_inspector::types::DieState;

/// Die map with a circular wafer inscribed in the grid; everything outside
/// the circle is background.
pub fn wafer_map(rows: usize, cols: usize) -> DieMap {
    let mut map = DieMap::filled(rows, cols, DieState::Background);
    let (cy, cx) = ((rows as f32 - 1.0) * 0.5, (cols as f32 - 1.0) * 0.5);
    let (ry, rx) = (rows as f32 * 0.5, cols as f32 * 0.5);
    for r in 0..rows {
        for c in 0..cols {
            let dy = (r as f32 - cy) / ry;
            let dx = (c as f32 - cx) / rx;
            if dx * dx + dy * dy <= 1.0 {
                map.set(r, c, DieState::Normal);
            }
        }
    }
    map
}

/// Wafer map with a diagonal scratch of defective dies.
pub fn scratch_map(rows: usize, cols: usize) -> DieMap {
    let mut map = wafer_map(rows, cols);
    let n = rows.min(cols);
    for i in n / 4..3 * n / 4 {
        map.set(i, i, DieState::Defect);
    }
    map
}

/// Bright wafer disk on a dark background, optionally with a dark blob.
pub fn wafer_photo(
    width: u32,
    height: u32,
    radius: f32,
    blob: Option<(f32, f32, f32)>,
) -> RgbImage {
    let (cx, cy) = (width as f32 * 0.5, height as f32 * 0.5);
    RgbImage::from_fn(width, height, |x, y| {
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        let inside = (px - cx).powi(2) + (py - cy).powi(2) <= radius * radius;
        let in_blob = blob.is_some_and(|(bx, by, br)| {
            (px - bx).powi(2) + (py - by).powi(2) <= br * br
        });
        match (inside, in_blob) {
            (true, true) => Rgb([40, 40, 40]),
            (true, false) => Rgb([170, 165, 160]),
            (false, _) => Rgb([15, 15, 15]),
        }
    })
}
