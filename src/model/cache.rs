//! Thread-safe load-or-get cache of models keyed by model id.
//!
//! Each key owns a `OnceLock`: the first caller runs the loader while later
//! callers for the same key block on it and reuse the outcome. Failures are
//! cached too, so a broken artifact is attempted at most once. Ids must be
//! unique among the models sharing a cache; `ModelRunner` enforces this.
use super::loader::LoadedModel;
use crate::error::ModelError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

type Slot = Arc<OnceLock<Result<Arc<LoadedModel>, ModelError>>>;

#[derive(Debug, Default)]
pub struct ModelCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(id.to_string()).or_default().clone()
    }

    /// Return the cached model for `id`, running `load` on first use only.
    pub fn get_or_load<F>(&self, id: &str, load: F) -> Result<Arc<LoadedModel>, ModelError>
    where
        F: FnOnce() -> Result<LoadedModel, ModelError>,
    {
        // The map lock is released before loading so other keys stay available.
        let slot = self.slot(id);
        slot.get_or_init(|| load().map(Arc::new)).clone()
    }

    /// Seed the cache with an already-built model. Returns `false` when the
    /// key was already resolved.
    pub fn insert(&self, model: LoadedModel) -> bool {
        let slot = self.slot(&model.id);
        slot.set(Ok(Arc::new(model))).is_ok()
    }

    /// Number of keys that resolved to a usable model.
    pub fn loaded_count(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| matches!(slot.get(), Some(Ok(_))))
            .count()
    }
}
