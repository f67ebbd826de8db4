//! Error taxonomy for the inspection pipeline.
//!
//! Input errors abort an inspection and reach the caller. Model errors are
//! recovered inside the model runner (synthetic fallback) and never escape
//! [`InspectionPipeline::inspect`](crate::pipeline::InspectionPipeline::inspect).
//! Validation rejection is not an error at all; it drives the retry loop.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while acquiring and decoding the raw wafer input.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("unsupported input kind: {}", .0.display())]
    UnsupportedInputKind(PathBuf),

    #[error("failed to decode {}: {reason}", path.display())]
    DecodeError { path: PathBuf, reason: String },
}

impl InputError {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        InputError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Failures while loading or running a classifier.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("model artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    #[error("invalid model manifest {}: {reason}", path.display())]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("duplicate model id '{0}'; only the first manifest is used")]
    DuplicateId(String),

    #[error("failed to load model '{model}': {reason}")]
    Load { model: String, reason: String },

    #[error("input shape mismatch for '{model}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        model: String,
        expected: [usize; 3],
        actual: [usize; 3],
    },

    #[error("inference failed for '{model}': {reason}")]
    Inference { model: String, reason: String },
}

/// Top-level error returned by the pipeline and the binaries.
#[derive(Error, Debug)]
pub enum InspectError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, InspectError>;
