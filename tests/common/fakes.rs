use ndarray::ArrayView4;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wafer_inspector::model::{
    Classifier, LabelTable, ModelCache, ModelLoader, ModelManifest, ModelRunner, DIE_MAP_LABELS,
    PHOTOGRAPH_LABELS,
};
use wafer_inspector::types::InputKind;
use wafer_inspector::{InspectionPipeline, ModelError, PipelineParams};

/// Replays a fixed list of outputs, repeating the last one.
pub struct Replay {
    outputs: Vec<Vec<f32>>,
    next: AtomicUsize,
}

impl Classifier for Replay {
    fn predict(&self, _input: ArrayView4<'_, f32>) -> Result<Vec<f32>, String> {
        let i = self.next.fetch_add(1, Ordering::SeqCst);
        Ok(self.outputs[i.min(self.outputs.len() - 1)].clone())
    }
}

pub struct Broken;

impl Classifier for Broken {
    fn predict(&self, _input: ArrayView4<'_, f32>) -> Result<Vec<f32>, String> {
        Err("device lost".to_string())
    }
}

/// Loader keyed by model id. An id registered with no outputs loads a
/// classifier that always fails; an unknown id fails to load.
#[derive(Default)]
pub struct FakeLoader {
    outputs: HashMap<String, Vec<Vec<f32>>>,
    pub loads: AtomicUsize,
}

impl FakeLoader {
    pub fn with(mut self, id: &str, outputs: Vec<Vec<f32>>) -> Self {
        self.outputs.insert(id.to_string(), outputs);
        self
    }
}

impl ModelLoader for FakeLoader {
    fn load(&self, manifest: &ModelManifest) -> Result<Box<dyn Classifier>, ModelError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match self.outputs.get(&manifest.id) {
            Some(outputs) if outputs.is_empty() => Ok(Box::new(Broken)),
            Some(outputs) => Ok(Box::new(Replay {
                outputs: outputs.clone(),
                next: AtomicUsize::new(0),
            })),
            None => Err(ModelError::Load {
                model: manifest.id.clone(),
                reason: "unknown test model".to_string(),
            }),
        }
    }
}

pub fn manifest(id: &str, kind: InputKind) -> ModelManifest {
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

/// Distribution over `labels` with the given entries; the remaining mass is
/// spread evenly over the other classes.
pub fn distribution(labels: &LabelTable, entries: &[(&str, f32)]) -> Vec<f32> {
    let assigned: f32 = entries.iter().map(|(_, p)| p).sum();
    let free = labels.len() - entries.len();
    let rest = if free > 0 {
        (1.0 - assigned) / free as f32
    } else {
        0.0
    };
    let mut probs = vec![rest; labels.len()];
    for (label, p) in entries {
        let i = labels
            .index_of(label)
            .unwrap_or_else(|| panic!("unknown label {label}"));
        probs[i] = *p;
    }
    probs
}

pub fn die_probs(entries: &[(&str, f32)]) -> Vec<f32> {
    distribution(&LabelTable::die_map(), entries)
}

pub fn photo_probs(entries: &[(&str, f32)]) -> Vec<f32> {
    distribution(&LabelTable::photograph(), entries)
}

/// Pipeline over fake models with a seeded simulation fallback.
pub fn pipeline(loader: FakeLoader, manifests: Vec<ModelManifest>) -> InspectionPipeline {
    pipeline_with(loader, manifests, PipelineParams::default())
}

pub fn pipeline_with(
    loader: FakeLoader,
    manifests: Vec<ModelManifest>,
    params: PipelineParams,
) -> InspectionPipeline {
    let runner = ModelRunner::with_loader(manifests, Arc::new(loader), Arc::new(ModelCache::new()))
        .with_seed(11);
    InspectionPipeline::new(params, runner)
}
