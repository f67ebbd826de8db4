//! Model Runner and the pieces it is built from.
//!
//! Modules
//! - [`labels`] – per-model label tables and the two reference orders.
//! - [`manifest`] – JSON artifact bundle: id, architecture, input contract,
//!   label order, weights.
//! - [`classifier`] – the `Classifier` trait, softmax, and the built-in
//!   `linear-softmax` architecture.
//! - [`loader`] – `ModelLoader` trait and the built-in loader.
//! - [`cache`] – thread-safe load-or-get cache shared across inspections.
//! - [`runner`] – routing, shape checks, failure capture, simulation.
//!
//! A prediction always carries the `Arc<LabelTable>` of the model that
//! produced it; nothing decodes an output vector through a shared table.

pub mod cache;
pub mod classifier;
pub mod labels;
pub mod loader;
pub mod manifest;
pub mod runner;

pub use cache::ModelCache;
pub use classifier::{softmax, Classifier, LinearSoftmax, LINEAR_SOFTMAX};
pub use labels::{LabelTable, DIE_MAP_LABELS, PHOTOGRAPH_LABELS};
pub use loader::{BuiltinLoader, LoadedModel, ModelLoader};
pub use manifest::ModelManifest;
pub use runner::{
    load_manifests, ModelFailure, ModelPrediction, ModelRunner, RunOutcome, SIMULATION_TAG,
};
