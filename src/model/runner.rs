//! Model Runner: routes a canonical tensor to the configured classifiers and
//! collects one prediction per model.
//!
//! Routing
//! - photograph tensors go to the first photograph model only;
//! - die-map tensors go to every die-map model, in configuration order.
//!
//! Model ids are unique within a runner: a manifest repeating an earlier id is
//! set aside and reported as a failure on every run for its input kind.
//!
//! Load and inference failures are logged and recorded, never propagated.
//! When nothing produced a result, [`ModelRunner::simulate`] yields a random
//! distribution tagged as a simulation.
use super::cache::ModelCache;
use super::labels::LabelTable;
use super::loader::{BuiltinLoader, LoadedModel, ModelLoader};
use super::manifest::ModelManifest;
use crate::canonical::CanonicalTensor;
use crate::error::ModelError;
use crate::types::InputKind;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Prefix of every simulated model identifier.
pub const SIMULATION_TAG: &str = "Simulation";

/// Tolerance on `sum(p) == 1` for a model's output vector.
const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// One model's verdict, decoded with that model's own label table.
#[derive(Clone, Debug)]
pub struct ModelPrediction {
    pub model_id: String,
    pub labels: Arc<LabelTable>,
    pub probabilities: Vec<f32>,
    /// Index of the top class (first maximum).
    pub top: usize,
    pub simulated: bool,
}

impl ModelPrediction {
    pub fn new(
        model_id: impl Into<String>,
        labels: Arc<LabelTable>,
        probabilities: Vec<f32>,
        simulated: bool,
    ) -> Self {
        let top = argmax(&probabilities);
        Self {
            model_id: model_id.into(),
            labels,
            probabilities,
            top,
            simulated,
        }
    }

    pub fn predicted_label(&self) -> &str {
        self.labels.label(self.top).unwrap_or_default()
    }

    pub fn confidence(&self) -> f32 {
        self.probabilities.get(self.top).copied().unwrap_or(0.0)
    }

    pub fn has_defect(&self) -> bool {
        !self.labels.is_no_defect(self.predicted_label())
    }

    /// Distribution keyed by label.
    pub fn distribution(&self) -> BTreeMap<String, f32> {
        self.labels
            .labels()
            .iter()
            .cloned()
            .zip(self.probabilities.iter().copied())
            .collect()
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// A model that was targeted but did not produce a result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFailure {
    pub model_id: String,
    pub reason: String,
}

/// Everything one pass of the runner produced.
#[derive(Clone, Debug, Default)]
pub struct RunOutcome {
    pub predictions: Vec<ModelPrediction>,
    pub failures: Vec<ModelFailure>,
}

pub struct ModelRunner {
    models: Vec<ModelManifest>,
    duplicates: Vec<ModelManifest>,
    loader: Arc<dyn ModelLoader>,
    cache: Arc<ModelCache>,
    rng: Mutex<StdRng>,
}

impl ModelRunner {
    /// Runner over `models` using the built-in loader and a fresh cache.
    pub fn new(models: Vec<ModelManifest>) -> Self {
        Self::with_loader(models, Arc::new(BuiltinLoader), Arc::new(ModelCache::new()))
    }

    pub fn with_loader(
        models: Vec<ModelManifest>,
        loader: Arc<dyn ModelLoader>,
        cache: Arc<ModelCache>,
    ) -> Self {
        let (models, duplicates) = split_duplicates(models);
        for manifest in &duplicates {
            warn!("ignoring model manifest: {}", ModelError::DuplicateId(manifest.id.clone()));
        }
        Self {
            models,
            duplicates,
            loader,
            cache,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Make the simulation fallback reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    pub fn models(&self) -> &[ModelManifest] {
        &self.models
    }

    /// Manifests set aside because their id was already taken.
    pub fn duplicates(&self) -> &[ModelManifest] {
        &self.duplicates
    }

    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    pub fn has_models_for(&self, kind: InputKind) -> bool {
        self.models.iter().any(|m| m.input_kind == kind)
    }

    /// Models a tensor of `kind` is routed to.
    pub fn targets(&self, kind: InputKind) -> Vec<&ModelManifest> {
        let matching = self.models.iter().filter(move |m| m.input_kind == kind);
        match kind {
            InputKind::Photograph => matching.take(1).collect(),
            InputKind::CategoricalMap => matching.collect(),
        }
    }

    /// Run every targeted model once against `tensor`.
    pub fn run(&self, tensor: &CanonicalTensor) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        let targets = self.targets(tensor.kind);
        if targets.is_empty() {
            warn!("no {} models configured", tensor.kind);
        }
        outcome.failures.extend(
            self.duplicates
                .iter()
                .filter(|m| m.input_kind == tensor.kind)
                .map(|m| ModelFailure {
                    model_id: m.id.clone(),
                    reason: ModelError::DuplicateId(m.id.clone()).to_string(),
                }),
        );
        for manifest in targets {
            match self.run_one(manifest, tensor) {
                Ok(prediction) => {
                    debug!(
                        "model '{}': {} ({:.1}%)",
                        prediction.model_id,
                        prediction.predicted_label(),
                        prediction.confidence() * 100.0
                    );
                    outcome.predictions.push(prediction);
                }
                Err(err) => {
                    warn!("model '{}' failed: {err}", manifest.id);
                    outcome.failures.push(ModelFailure {
                        model_id: manifest.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        outcome
    }

    fn run_one(
        &self,
        manifest: &ModelManifest,
        tensor: &CanonicalTensor,
    ) -> Result<ModelPrediction, ModelError> {
        let model = self.cache.get_or_load(&manifest.id, || {
            let classifier = self.loader.load(manifest)?;
            LoadedModel::from_manifest(manifest, classifier)
        })?;
        let actual = tensor.chw();
        if actual != model.input_shape {
            return Err(ModelError::ShapeMismatch {
                model: model.id.clone(),
                expected: model.input_shape,
                actual,
            });
        }
        let inference = |reason: String| ModelError::Inference {
            model: model.id.clone(),
            reason,
        };
        let probabilities = model.classifier.predict(tensor.view()).map_err(inference)?;
        check_distribution(&probabilities, model.labels.len()).map_err(inference)?;
        Ok(ModelPrediction::new(
            model.id.clone(),
            Arc::clone(&model.labels),
            probabilities,
            false,
        ))
    }

    /// Label table a simulated result for `kind` should use: the first
    /// targeted model's, or the reference table for that kind.
    pub fn fallback_labels(&self, kind: InputKind) -> Arc<LabelTable> {
        let table = self
            .targets(kind)
            .first()
            .and_then(|manifest| manifest.label_table().ok())
            .unwrap_or_else(|| match kind {
                InputKind::CategoricalMap => LabelTable::die_map(),
                InputKind::Photograph => LabelTable::photograph(),
            });
        table.shared()
    }

    /// Random distribution over `labels`, clearly tagged as a simulation.
    pub fn simulate(&self, labels: Arc<LabelTable>, reason: &str) -> ModelPrediction {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let raw: Vec<f32> = (0..labels.len()).map(|_| rng.gen::<f32>()).collect();
        let total: f32 = raw.iter().sum();
        let probabilities = if total > 0.0 {
            raw.iter().map(|v| v / total).collect()
        } else {
            vec![1.0 / labels.len() as f32; labels.len()]
        };
        let id = format!("{SIMULATION_TAG} ({reason})");
        warn!("using simulated inference: {id}");
        ModelPrediction::new(id, labels, probabilities, true)
    }
}

fn check_distribution(probabilities: &[f32], classes: usize) -> Result<(), String> {
    if probabilities.len() != classes {
        return Err(format!(
            "expected {classes} probabilities, got {}",
            probabilities.len()
        ));
    }
    if let Some(bad) = probabilities
        .iter()
        .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
    {
        return Err(format!("probability {bad} outside [0, 1]"));
    }
    let sum: f32 = probabilities.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(format!("probabilities sum to {sum:.4}"));
    }
    Ok(())
}

/// Keep the first manifest for each id; later repeats are returned separately.
fn split_duplicates(models: Vec<ModelManifest>) -> (Vec<ModelManifest>, Vec<ModelManifest>) {
    let mut seen = HashSet::new();
    models
        .into_iter()
        .partition(|m| seen.insert(m.id.clone()))
}

/// Load manifests from disk, keeping the ones that parse and whose id has
/// not been seen yet.
pub fn load_manifests(paths: &[PathBuf]) -> (Vec<ModelManifest>, Vec<ModelFailure>) {
    let mut manifests: Vec<ModelManifest> = Vec::new();
    let mut failures = Vec::new();
    for path in paths {
        match ModelManifest::load(path) {
            Ok(m) if manifests.iter().any(|kept| kept.id == m.id) => {
                let err = ModelError::DuplicateId(m.id.clone());
                warn!("skipping model manifest {}: {err}", path.display());
                failures.push(ModelFailure {
                    model_id: m.id,
                    reason: err.to_string(),
                });
            }
            Ok(m) => manifests.push(m),
            Err(err) => {
                warn!("skipping model manifest {}: {err}", path.display());
                failures.push(ModelFailure {
                    model_id: manifest_stem(path),
                    reason: err.to_string(),
                });
            }
        }
    }
    (manifests, failures)
}

fn manifest_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::classifier::Classifier;
    use crate::model::labels::{DIE_MAP_LABELS, PHOTOGRAPH_LABELS};
    use ndarray::{Array4, ArrayView4};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn predict(&self, _input: ArrayView4<'_, f32>) -> Result<Vec<f32>, String> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn predict(&self, _input: ArrayView4<'_, f32>) -> Result<Vec<f32>, String> {
            Err("device lost".to_string())
        }
    }

    /// Builds classifiers by model id and counts loads.
    #[derive(Default)]
    struct FakeLoader {
        loads: AtomicUsize,
    }

    impl ModelLoader for FakeLoader {
        fn load(&self, manifest: &ModelManifest) -> Result<Box<dyn Classifier>, ModelError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            let one_hot = |i: usize| {
                let mut p = vec![0.0; 9];
                p[i] = 1.0;
                p
            };
            match manifest.id.as_str() {
                "scratch" => Ok(Box::new(Fixed(one_hot(7)))),
                "index8" => Ok(Box::new(Fixed(one_hot(8)))),
                "broken" => Ok(Box::new(Broken)),
                "unnormalised" => Ok(Box::new(Fixed(vec![0.5; 9]))),
                other => Err(ModelError::Load {
                    model: other.to_string(),
                    reason: "no such model".to_string(),
                }),
            }
        }
    }

    fn manifest(id: &str, kind: InputKind) -> ModelManifest {
        let (labels, no_defect, shape) = match kind {
            InputKind::CategoricalMap => (&DIE_MAP_LABELS, "none", [3, 56, 56]),
            InputKind::Photograph => (&PHOTOGRAPH_LABELS, "Normal", [3, 224, 224]),
        };
        ModelManifest {
            id: id.to_string(),
            architecture: "fake".to_string(),
            input_kind: kind,
            input_shape: shape,
            labels: labels.iter().map(|s| s.to_string()).collect(),
            no_defect_label: no_defect.to_string(),
            weights: None,
        }
    }

    fn tensor(kind: InputKind, h: usize, w: usize) -> CanonicalTensor {
        CanonicalTensor {
            kind,
            data: Array4::zeros((1, 3, h, w)),
        }
    }

    fn build_runner(models: Vec<ModelManifest>) -> (ModelRunner, Arc<FakeLoader>) {
        let loader = Arc::new(FakeLoader::default());
        let runner = ModelRunner::with_loader(models, loader.clone(), Arc::new(ModelCache::new()))
            .with_seed(7);
        (runner, loader)
    }

    #[test]
    fn each_model_decodes_with_its_own_labels() {
        let (runner, _) = build_runner(vec![manifest("index8", InputKind::CategoricalMap)]);
        let die = runner.run(&tensor(InputKind::CategoricalMap, 56, 56));
        assert_eq!(die.predictions.len(), 1);
        assert_eq!(die.predictions[0].predicted_label(), "none");
        assert!(!die.predictions[0].has_defect());

        // Same id, same output vector, but a photograph label table.
        let (runner, _) = build_runner(vec![manifest("index8", InputKind::Photograph)]);
        let photo = runner.run(&tensor(InputKind::Photograph, 224, 224));
        assert_eq!(photo.predictions[0].predicted_label(), "Scratch");
        assert!(photo.predictions[0].has_defect());
    }

    #[test]
    fn failures_are_recorded_without_stopping_other_models() {
        let (runner, _) = build_runner(vec![
            manifest("missing", InputKind::CategoricalMap),
            manifest("broken", InputKind::CategoricalMap),
            manifest("unnormalised", InputKind::CategoricalMap),
            manifest("scratch", InputKind::CategoricalMap),
        ]);
        let out = runner.run(&tensor(InputKind::CategoricalMap, 56, 56));
        assert_eq!(out.predictions.len(), 1);
        assert_eq!(out.predictions[0].predicted_label(), "Scratch");
        let failed: Vec<_> = out.failures.iter().map(|f| f.model_id.as_str()).collect();
        assert_eq!(failed, ["missing", "broken", "unnormalised"]);
    }

    #[test]
    fn shape_mismatch_is_a_failure() {
        let (runner, _) = build_runner(vec![manifest("scratch", InputKind::CategoricalMap)]);
        let out = runner.run(&tensor(InputKind::CategoricalMap, 28, 28));
        assert!(out.predictions.is_empty());
        assert!(out.failures[0].reason.contains("shape mismatch"));
    }

    #[test]
    fn photographs_use_only_the_first_photograph_model() {
        let (runner, _) = build_runner(vec![
            manifest("scratch", InputKind::CategoricalMap),
            manifest("index8", InputKind::Photograph),
            manifest("broken", InputKind::Photograph),
        ]);
        assert_eq!(runner.targets(InputKind::Photograph).len(), 1);
        assert_eq!(runner.targets(InputKind::CategoricalMap).len(), 1);
        let out = runner.run(&tensor(InputKind::Photograph, 224, 224));
        assert_eq!(out.predictions.len(), 1);
        assert_eq!(out.predictions[0].model_id, "index8");
    }

    #[test]
    fn models_load_once_across_runs() {
        let (runner, loader) = build_runner(vec![
            manifest("scratch", InputKind::CategoricalMap),
            manifest("missing", InputKind::CategoricalMap),
        ]);
        let t = tensor(InputKind::CategoricalMap, 56, 56);
        let first = runner.run(&t);
        let second = runner.run(&t);
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(first.predictions[0].probabilities, second.predictions[0].probabilities);
        assert_eq!(runner.cache().loaded_count(), 1);
    }

    #[test]
    fn repeated_ids_are_set_aside_and_reported() {
        let mut second = manifest("scratch", InputKind::CategoricalMap);
        second.architecture = "other".to_string();
        let (runner, loader) = build_runner(vec![
            manifest("scratch", InputKind::CategoricalMap),
            second,
            manifest("scratch", InputKind::Photograph),
        ]);
        assert_eq!(runner.models().len(), 1);
        assert_eq!(runner.duplicates().len(), 2);
        assert!(!runner.has_models_for(InputKind::Photograph));

        let out = runner.run(&tensor(InputKind::CategoricalMap, 56, 56));
        assert_eq!(out.predictions.len(), 1);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].model_id, "scratch");
        assert!(out.failures[0].reason.contains("duplicate model id"));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

        let photo = runner.run(&tensor(InputKind::Photograph, 224, 224));
        assert!(photo.predictions.is_empty());
        assert_eq!(photo.failures.len(), 1);
    }

    #[test]
    fn load_manifests_skips_repeated_ids() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, id: &str| {
            let path = dir.path().join(name);
            let json = serde_json::to_string(&manifest(id, InputKind::CategoricalMap)).unwrap();
            std::fs::write(&path, json).unwrap();
            path
        };
        let paths = vec![write("a.json", "m"), write("b.json", "m"), write("c.json", "n")];
        let (manifests, skipped) = load_manifests(&paths);
        let ids: Vec<_> = manifests.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["m", "n"]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].model_id, "m");
        assert!(skipped[0].reason.contains("duplicate model id 'm'"));
    }

    #[test]
    fn simulation_is_tagged_and_normalised() {
        let (runner, _) = build_runner(Vec::new());
        let labels = runner.fallback_labels(InputKind::Photograph);
        let sim = runner.simulate(labels, "Models Failed");
        assert!(sim.simulated);
        assert!(sim.model_id.starts_with(SIMULATION_TAG));
        assert_eq!(sim.probabilities.len(), 9);
        let sum: f32 = sim.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert_eq!(sim.labels.no_defect(), "Normal");
    }

    #[test]
    fn seeded_simulations_are_reproducible() {
        let a = ModelRunner::new(Vec::new()).with_seed(42);
        let b = ModelRunner::new(Vec::new()).with_seed(42);
        let labels = LabelTable::die_map().shared();
        assert_eq!(
            a.simulate(labels.clone(), "x").probabilities,
            b.simulate(labels, "x").probabilities
        );
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
