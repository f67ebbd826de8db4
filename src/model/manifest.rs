//! Model artifact bundles described by a JSON manifest.
//!
//! ```json
//! {
//!   "id": "diemap-linear",
//!   "architecture": "linear-softmax",
//!   "input_kind": "categorical-map",
//!   "input_shape": [3, 56, 56],
//!   "labels": ["Center", "Donut", "..."],
//!   "no_defect_label": "none",
//!   "weights": "diemap-linear.weights.json"
//! }
//! ```
//!
//! Relative `weights` paths resolve against the manifest's directory.
use super::labels::LabelTable;
use crate::error::ModelError;
use crate::types::InputKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub id: String,
    pub architecture: String,
    pub input_kind: InputKind,
    /// Expected per-sample `[C, H, W]`.
    pub input_shape: [usize; 3],
    pub labels: Vec<String>,
    pub no_defect_label: String,
    #[serde(default)]
    pub weights: Option<PathBuf>,
}

impl ModelManifest {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::ArtifactNotFound(path.to_path_buf()));
        }
        let invalid = |reason: String| ModelError::ManifestInvalid {
            path: path.to_path_buf(),
            reason,
        };
        let contents = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let mut manifest: ModelManifest =
            serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        manifest.label_table().map_err(invalid)?;
        if let (Some(weights), Some(dir)) = (&manifest.weights, path.parent()) {
            if weights.is_relative() {
                manifest.weights = Some(dir.join(weights));
            }
        }
        Ok(manifest)
    }

    pub fn label_table(&self) -> Result<LabelTable, String> {
        LabelTable::new(self.labels.clone(), self.no_defect_label.clone())
    }

    /// Number of input features a flat classifier sees.
    pub fn input_len(&self) -> usize {
        self.input_shape.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::labels::DIE_MAP_LABELS;

    fn manifest_json(no_defect: &str) -> String {
        serde_json::json!({
            "id": "m1",
            "architecture": "linear-softmax",
            "input_kind": "categorical-map",
            "input_shape": [3, 56, 56],
            "labels": DIE_MAP_LABELS,
            "no_defect_label": no_defect,
            "weights": "m1.weights.json"
        })
        .to_string()
    }

    #[test]
    fn loads_and_resolves_relative_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m1.json");
        fs::write(&path, manifest_json("none")).unwrap();
        let manifest = ModelManifest::load(&path).unwrap();
        assert_eq!(manifest.input_kind, InputKind::CategoricalMap);
        assert_eq!(manifest.input_len(), 3 * 56 * 56);
        assert_eq!(manifest.weights, Some(dir.path().join("m1.weights.json")));
        assert_eq!(manifest.label_table().unwrap(), LabelTable::die_map());
    }

    #[test]
    fn rejects_unknown_no_defect_label() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, manifest_json("Normal")).unwrap();
        let err = ModelManifest::load(&path).unwrap_err();
        assert!(matches!(err, ModelError::ManifestInvalid { .. }), "{err}");
    }

    #[test]
    fn missing_manifest_is_artifact_not_found() {
        let err = ModelManifest::load(Path::new("/no/such/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::ArtifactNotFound(_)));
    }
}
