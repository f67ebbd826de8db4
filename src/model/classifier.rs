//! Classifier contract and the built-in `linear-softmax` architecture.
use ndarray::{Array1, Array2, ArrayView4};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Architecture identifier of [`LinearSoftmax`].
pub const LINEAR_SOFTMAX: &str = "linear-softmax";

/// Tensor in, probability vector out.
///
/// Implementations are stateless across calls and may be invoked from
/// several threads at once. The returned vector is indexed by the owning
/// model's label table.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, String>;
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[derive(Deserialize)]
struct LinearWeightsFile {
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

/// `softmax(W·x + b)` over the flattened `[C, H, W]` sample.
#[derive(Clone, Debug)]
pub struct LinearSoftmax {
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl LinearSoftmax {
    pub fn new(weights: Array2<f32>, bias: Array1<f32>) -> Result<Self, String> {
        if weights.nrows() != bias.len() {
            return Err(format!(
                "weights have {} rows but bias has {} entries",
                weights.nrows(),
                bias.len()
            ));
        }
        Ok(Self { weights, bias })
    }

    /// Load weights from JSON (`{"weights": [[..]], "bias": [..]}`) and check
    /// them against the expected class and feature counts.
    pub fn from_json_file(path: &Path, classes: usize, features: usize) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read weights {}: {e}", path.display()))?;
        let file: LinearWeightsFile = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse weights {}: {e}", path.display()))?;
        if file.weights.len() != classes {
            return Err(format!(
                "expected {classes} weight rows, found {}",
                file.weights.len()
            ));
        }
        if let Some(row) = file.weights.iter().find(|r| r.len() != features) {
            return Err(format!(
                "expected {features} weights per class, found {}",
                row.len()
            ));
        }
        let flat: Vec<f32> = file.weights.into_iter().flatten().collect();
        let weights = Array2::from_shape_vec((classes, features), flat).map_err(|e| e.to_string())?;
        Self::new(weights, Array1::from(file.bias))
    }

    pub fn classes(&self) -> usize {
        self.weights.nrows()
    }

    pub fn features(&self) -> usize {
        self.weights.ncols()
    }
}

impl Classifier for LinearSoftmax {
    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<Vec<f32>, String> {
        if input.shape()[0] != 1 {
            return Err(format!("expected a batch of one, got {}", input.shape()[0]));
        }
        if input.len() != self.features() {
            return Err(format!(
                "expected {} features, got {}",
                self.features(),
                input.len()
            ));
        }
        let x: Array1<f32> = input.iter().copied().collect();
        let logits = self.weights.dot(&x) + &self.bias;
        Ok(softmax(&logits.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array4};

    #[test]
    fn softmax_is_a_distribution_even_for_large_logits() {
        let p = softmax(&[1000.0, 1001.0, 999.0]);
        let sum: f32 = p.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(p.iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(p[1] > p[0] && p[0] > p[2]);
    }

    #[test]
    fn linear_model_is_deterministic() {
        let model = LinearSoftmax::new(
            arr2(&[[1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 0.0, 2.0]]),
            arr1(&[0.0, 0.5]),
        )
        .unwrap();
        let mut x = Array4::<f32>::zeros((1, 1, 2, 2));
        x[[0, 0, 1, 1]] = 1.0;
        let a = model.predict(x.view()).unwrap();
        let b = model.predict(x.view()).unwrap();
        assert_eq!(a, b);
        assert!(a[1] > a[0]);
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let model = LinearSoftmax::new(Array2::zeros((2, 4)), Array1::zeros(2)).unwrap();
        let x = Array4::<f32>::zeros((1, 1, 3, 3));
        assert!(model.predict(x.view()).is_err());
        assert!(LinearSoftmax::new(Array2::zeros((2, 4)), Array1::zeros(3)).is_err());
    }
}
