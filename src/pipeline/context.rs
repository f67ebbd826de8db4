//! Per-inspection mutable state threaded through every stage.
//!
//! All fields are always present. Stages that have not run yet leave the
//! unset values (empty tensor, empty maps, `0.0`, `false`, `Pending`).
use crate::analysis::Analysis;
use crate::canonical::{CanonicalTensor, Provenance};
use crate::ensemble::{Resolution, ResolutionSource};
use crate::explain::AlertTier;
use crate::model::{ModelFailure, ModelPrediction};
use crate::types::{InputKind, Severity};
use crate::validation::{FailedCriterion, ValidationState};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct InspectionContext {
    // Identity
    pub source: String,
    pub source_kind: InputKind,

    // Canonical input
    pub tensor: CanonicalTensor,
    pub provenance: Provenance,

    // Model outputs (latest attempt)
    pub individual: Vec<ModelPrediction>,
    pub failures: Vec<ModelFailure>,
    pub chosen: Option<ModelPrediction>,
    pub predicted_class: String,
    pub confidence: f32,
    pub distribution: BTreeMap<String, f32>,
    pub no_defect_label: String,
    pub has_defect: bool,
    pub resolved_by: String,
    pub resolution_source: Option<ResolutionSource>,
    pub simulated: bool,

    // Analysis
    pub analysis: Analysis,

    // Control
    pub attempts: u32,
    pub max_attempts: u32,
    pub validation_state: ValidationState,
    pub failed_criteria: Vec<FailedCriterion>,
    pub is_valid: bool,

    // Output
    pub explanation: String,
    pub alert_tier: AlertTier,
}

impl InspectionContext {
    pub fn new(source: impl Into<String>, source_kind: InputKind, max_attempts: u32) -> Self {
        Self {
            source: source.into(),
            source_kind,
            tensor: CanonicalTensor::empty(),
            provenance: Provenance::default(),
            individual: Vec::new(),
            failures: Vec::new(),
            chosen: None,
            predicted_class: String::new(),
            confidence: 0.0,
            distribution: BTreeMap::new(),
            no_defect_label: String::new(),
            has_defect: false,
            resolved_by: String::new(),
            resolution_source: None,
            simulated: false,
            analysis: Analysis::default(),
            attempts: 0,
            max_attempts: max_attempts.max(1),
            validation_state: ValidationState::Pending,
            failed_criteria: Vec::new(),
            is_valid: false,
            explanation: String::new(),
            alert_tier: AlertTier::default(),
        }
    }

    /// Copy the resolved verdict into the context. `has_defect` is derived
    /// from the chosen model's own no-defect label.
    pub fn apply_resolution(&mut self, resolution: &Resolution) {
        let chosen = &resolution.chosen;
        self.predicted_class = chosen.predicted_label().to_string();
        self.confidence = chosen.confidence();
        self.distribution = chosen.distribution();
        self.no_defect_label = chosen.labels.no_defect().to_string();
        self.has_defect = chosen.has_defect();
        self.resolved_by = resolution.resolved_by();
        self.resolution_source = Some(resolution.source);
        self.simulated = chosen.simulated;
        self.individual = resolution.individual.clone();
        self.chosen = Some(chosen.clone());
    }

    pub fn severity(&self) -> Severity {
        self.analysis.severity
    }

    /// Whether validation gave up rather than passed.
    pub fn accepted_on_exhaustion(&self) -> bool {
        self.validation_state == ValidationState::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::resolve;
    use crate::model::LabelTable;

    #[test]
    fn fresh_context_holds_unset_values() {
        let ctx = InspectionContext::new("wafer.npy", InputKind::CategoricalMap, 0);
        assert!(ctx.tensor.is_empty());
        assert!(ctx.distribution.is_empty());
        assert!(!ctx.has_defect);
        assert!(!ctx.is_valid);
        assert_eq!(ctx.max_attempts, 1);
        assert_eq!(ctx.severity(), Severity::None);
        assert!(ctx.explanation.is_empty());
    }

    #[test]
    fn resolution_sets_label_consistent_defect_flag() {
        let mut probs = vec![0.0; 9];
        probs[8] = 1.0;
        let pred = ModelPrediction::new("m", LabelTable::die_map().shared(), probs, false);
        let res = resolve(vec![pred], || unreachable!());
        let mut ctx = InspectionContext::new("wafer.npy", InputKind::CategoricalMap, 3);
        ctx.apply_resolution(&res);
        assert_eq!(ctx.predicted_class, "none");
        assert_eq!(ctx.no_defect_label, "none");
        assert!(!ctx.has_defect);
        assert_eq!(ctx.confidence, 1.0);
        assert_eq!(ctx.distribution.len(), 9);
        assert_eq!(ctx.individual.len(), 1);
        assert!(ctx.chosen.is_some());
    }
}
