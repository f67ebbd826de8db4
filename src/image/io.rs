//! I/O helpers for photographed wafers and JSON artifacts.
//!
//! - `load_rgb_image`: read a PNG/JPEG into an 8-bit RGB buffer.
//! - `write_json_file`: pretty-print a serializable value to disk.
use crate::error::InputError;
use image::RgbImage;
use serde::Serialize;
use std::fs;
use std::path::Path;

fn open_image(path: &Path) -> Result<image::DynamicImage, InputError> {
    if !path.exists() {
        return Err(InputError::InputNotFound(path.to_path_buf()));
    }
    image::open(path).map_err(|e| InputError::decode(path, e.to_string()))
}

/// Load an image from disk as 8-bit RGB, dropping any alpha channel.
pub fn load_rgb_image(path: &Path) -> Result<RgbImage, InputError> {
    Ok(open_image(path)?.into_rgb8())
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), String> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Failed to serialize JSON for {}: {e}", path.display()))?;
    fs::write(path, json).map_err(|e| format!("Failed to write JSON {}: {e}", path.display()))
}

fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {e}", parent.display()))?;
        }
    }
    Ok(())
}
