//! Ensemble Resolver: pick one verdict out of several model predictions.
//!
//! The prediction with the strictly highest top-class confidence wins; equal
//! confidences keep the first one seen. When no model produced anything the
//! caller-supplied fallback (a tagged simulation) is used and appended to the
//! individual results so it stays visible in the audit trail.
use crate::model::ModelPrediction;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// How the chosen prediction was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Exactly one model answered.
    Single,
    /// Several models answered; highest confidence won.
    Ensemble,
    /// No model answered; a simulated distribution stands in.
    Simulation,
}

#[derive(Clone, Debug)]
pub struct Resolution {
    pub chosen: ModelPrediction,
    /// Every per-model prediction, in input order, untouched.
    pub individual: Vec<ModelPrediction>,
    pub source: ResolutionSource,
}

impl Resolution {
    /// Human-readable description, e.g. `Ensemble (Best: cnn-a)`.
    pub fn resolved_by(&self) -> String {
        match self.source {
            ResolutionSource::Single => self.chosen.model_id.clone(),
            ResolutionSource::Ensemble => format!("Ensemble (Best: {})", self.chosen.model_id),
            ResolutionSource::Simulation => self.chosen.model_id.clone(),
        }
    }
}

/// Index of the strictly highest confidence, first wins on ties.
pub fn best_index(predictions: &[ModelPrediction]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, p) in predictions.iter().enumerate() {
        let conf = p.confidence();
        if best.map_or(true, |(_, b)| conf > b) {
            best = Some((i, conf));
        }
    }
    best.map(|(i, _)| i)
}

/// Resolve `predictions` into one verdict; `fallback` runs only when empty.
pub fn resolve<F>(predictions: Vec<ModelPrediction>, fallback: F) -> Resolution
where
    F: FnOnce() -> ModelPrediction,
{
    match best_index(&predictions) {
        Some(i) => {
            let source = if predictions.len() == 1 {
                ResolutionSource::Single
            } else {
                ResolutionSource::Ensemble
            };
            let chosen = predictions[i].clone();
            for p in &predictions {
                debug!(
                    "  {}: {} ({:.1}%)",
                    p.model_id,
                    p.predicted_label(),
                    p.confidence() * 100.0
                );
            }
            debug!("resolved to {} from {}", chosen.predicted_label(), chosen.model_id);
            Resolution {
                chosen,
                individual: predictions,
                source,
            }
        }
        None => {
            let chosen = fallback();
            warn!("no model produced a result; resolved by {}", chosen.model_id);
            Resolution {
                individual: vec![chosen.clone()],
                chosen,
                source: ResolutionSource::Simulation,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LabelTable;

    fn prediction(id: &str, probabilities: Vec<f32>) -> ModelPrediction {
        ModelPrediction::new(id, LabelTable::die_map().shared(), probabilities, false)
    }

    fn peaked(id: &str, index: usize, p: f32) -> ModelPrediction {
        let rest = (1.0 - p) / 8.0;
        let mut v = vec![rest; 9];
        v[index] = p;
        prediction(id, v)
    }

    #[test]
    fn highest_confidence_wins() {
        let res = resolve(vec![peaked("a", 0, 0.6), peaked("b", 7, 0.9)], || {
            unreachable!()
        });
        assert_eq!(res.chosen.model_id, "b");
        assert_eq!(res.chosen.predicted_label(), "Scratch");
        assert_eq!(res.source, ResolutionSource::Ensemble);
        assert_eq!(res.resolved_by(), "Ensemble (Best: b)");
        assert_eq!(res.individual.len(), 2);
        assert_eq!(res.individual[0].model_id, "a");
    }

    #[test]
    fn ties_keep_first_seen() {
        for _ in 0..10 {
            let res = resolve(vec![peaked("first", 1, 0.7), peaked("second", 2, 0.7)], || {
                unreachable!()
            });
            assert_eq!(res.chosen.model_id, "first");
        }
    }

    #[test]
    fn single_result_is_not_an_ensemble() {
        let res = resolve(vec![peaked("only", 4, 0.5)], || unreachable!());
        assert_eq!(res.source, ResolutionSource::Single);
        assert_eq!(res.resolved_by(), "only");
    }

    #[test]
    fn empty_input_uses_tagged_fallback() {
        let res = resolve(Vec::new(), || {
            ModelPrediction::new(
                "Simulation (Models Failed)",
                LabelTable::die_map().shared(),
                vec![1.0 / 9.0; 9],
                true,
            )
        });
        assert_eq!(res.source, ResolutionSource::Simulation);
        assert!(res.chosen.simulated);
        assert_eq!(res.individual.len(), 1);
        assert_eq!(res.resolved_by(), "Simulation (Models Failed)");
    }
}
