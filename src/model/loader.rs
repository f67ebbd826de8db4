//! Turning a manifest into a runnable model.
use super::classifier::{Classifier, LinearSoftmax, LINEAR_SOFTMAX};
use super::labels::LabelTable;
use super::manifest::ModelManifest;
use crate::error::ModelError;
use crate::types::InputKind;
use std::fmt;
use std::sync::Arc;

/// A classifier bound to its own label table and input contract.
pub struct LoadedModel {
    pub id: String,
    pub input_kind: InputKind,
    pub input_shape: [usize; 3],
    pub labels: Arc<LabelTable>,
    pub classifier: Box<dyn Classifier>,
}

impl LoadedModel {
    pub fn from_manifest(
        manifest: &ModelManifest,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, ModelError> {
        let labels = manifest.label_table().map_err(|reason| ModelError::Load {
            model: manifest.id.clone(),
            reason,
        })?;
        Ok(Self {
            id: manifest.id.clone(),
            input_kind: manifest.input_kind,
            input_shape: manifest.input_shape,
            labels: labels.shared(),
            classifier,
        })
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("id", &self.id)
            .field("input_kind", &self.input_kind)
            .field("input_shape", &self.input_shape)
            .field("labels", &self.labels.labels())
            .finish_non_exhaustive()
    }
}

/// Builds classifiers for manifests. Injected into the runner so custom
/// architectures (or test doubles) can be plugged in.
pub trait ModelLoader: Send + Sync {
    fn load(&self, manifest: &ModelManifest) -> Result<Box<dyn Classifier>, ModelError>;
}

/// Loader for the architectures shipped with the crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinLoader;

impl ModelLoader for BuiltinLoader {
    fn load(&self, manifest: &ModelManifest) -> Result<Box<dyn Classifier>, ModelError> {
        match manifest.architecture.as_str() {
            LINEAR_SOFTMAX => {
                let path = manifest.weights.as_ref().ok_or_else(|| ModelError::Load {
                    model: manifest.id.clone(),
                    reason: "manifest has no weights path".to_string(),
                })?;
                if !path.exists() {
                    return Err(ModelError::ArtifactNotFound(path.clone()));
                }
                let model =
                    LinearSoftmax::from_json_file(path, manifest.labels.len(), manifest.input_len())
                        .map_err(|reason| ModelError::Load {
                            model: manifest.id.clone(),
                            reason,
                        })?;
                Ok(Box::new(model))
            }
            other => Err(ModelError::Load {
                model: manifest.id.clone(),
                reason: format!("unsupported architecture '{other}'"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::labels::DIE_MAP_LABELS;
    use std::path::PathBuf;

    fn manifest(architecture: &str, weights: Option<PathBuf>) -> ModelManifest {
        ModelManifest {
            id: "m".to_string(),
            architecture: architecture.to_string(),
            input_kind: InputKind::CategoricalMap,
            input_shape: [1, 1, 2],
            labels: DIE_MAP_LABELS.iter().map(|s| s.to_string()).collect(),
            no_defect_label: "none".to_string(),
            weights,
        }
    }

    #[test]
    fn unknown_architecture_is_a_load_error() {
        let err = BuiltinLoader.load(&manifest("resnet18", None)).err().unwrap();
        assert!(matches!(err, ModelError::Load { .. }));
    }

    #[test]
    fn missing_weights_are_reported() {
        let err = BuiltinLoader
            .load(&manifest(LINEAR_SOFTMAX, Some(PathBuf::from("/no/weights.json"))))
            .err().unwrap();
        assert!(matches!(err, ModelError::ArtifactNotFound(_)));
        let err = BuiltinLoader.load(&manifest(LINEAR_SOFTMAX, None)).err().unwrap();
        assert!(matches!(err, ModelError::Load { .. }));
    }

    #[test]
    fn loads_linear_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.json");
        let weights = serde_json::json!({
            "weights": vec![vec![0.0f32, 0.0]; 9],
            "bias": vec![0.0f32; 9],
        });
        std::fs::write(&path, weights.to_string()).unwrap();
        let m = manifest(LINEAR_SOFTMAX, Some(path));
        let classifier = BuiltinLoader.load(&m).unwrap();
        let loaded = LoadedModel::from_manifest(&m, classifier).unwrap();
        let x = ndarray::Array4::<f32>::zeros((1, 1, 1, 2));
        let p = loaded.classifier.predict(x.view()).unwrap();
        assert_eq!(p.len(), 9);
        assert!((p[0] - 1.0 / 9.0).abs() < 1e-6);
    }
}
