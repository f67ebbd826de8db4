//! Structured result handed to reporting and storage collaborators.
use super::context::InspectionContext;
use crate::canonical::Provenance;
use crate::diagnostics::TimingBreakdown;
use crate::ensemble::ResolutionSource;
use crate::explain::AlertTier;
use crate::model::{ModelFailure, ModelPrediction};
use crate::types::{ClassProbability, InputKind, IssueFlag, Recommendation, Severity};
use crate::validation::{FailedCriterion, ValidationState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One model's individual verdict.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResult {
    pub model: String,
    pub prediction: String,
    pub confidence: f32,
    pub probabilities: BTreeMap<String, f32>,
    pub simulated: bool,
}

impl From<&ModelPrediction> for ModelResult {
    fn from(p: &ModelPrediction) -> Self {
        Self {
            model: p.model_id.clone(),
            prediction: p.predicted_label().to_string(),
            confidence: p.confidence(),
            probabilities: p.distribution(),
            simulated: p.simulated,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReport {
    pub source: String,
    pub source_kind: InputKind,

    pub predicted_class: String,
    /// Fraction in `[0, 1]`.
    pub confidence: f32,
    pub distribution: BTreeMap<String, f32>,
    pub no_defect_label: String,
    pub has_defect: bool,
    pub resolved_by: String,
    pub resolution_source: Option<ResolutionSource>,
    pub simulated: bool,

    pub severity: Severity,
    pub consistency_score: f32,
    pub recommendation: Recommendation,
    pub issues: Vec<IssueFlag>,
    pub significant_issues: Vec<ClassProbability>,
    pub minor_issues: Vec<ClassProbability>,

    pub individual_results: Vec<ModelResult>,
    pub model_failures: Vec<ModelFailure>,

    pub attempts: u32,
    pub max_attempts: u32,
    pub is_valid: bool,
    pub validation_state: ValidationState,
    pub accepted_on_exhaustion: bool,
    pub failed_criteria: Vec<FailedCriterion>,

    pub explanation: String,
    pub alert_tier: AlertTier,

    pub provenance: Provenance,
    pub timings: TimingBreakdown,
}

impl InspectionReport {
    pub fn from_context(ctx: &InspectionContext, timings: TimingBreakdown) -> Self {
        Self {
            source: ctx.source.clone(),
            source_kind: ctx.source_kind,
            predicted_class: ctx.predicted_class.clone(),
            confidence: ctx.confidence,
            distribution: ctx.distribution.clone(),
            no_defect_label: ctx.no_defect_label.clone(),
            has_defect: ctx.has_defect,
            resolved_by: ctx.resolved_by.clone(),
            resolution_source: ctx.resolution_source,
            simulated: ctx.simulated,
            severity: ctx.analysis.severity,
            consistency_score: ctx.analysis.consistency_score,
            recommendation: ctx.analysis.recommendation,
            issues: ctx.analysis.issues.clone(),
            significant_issues: ctx.analysis.significant.clone(),
            minor_issues: ctx.analysis.minor.clone(),
            individual_results: ctx.individual.iter().map(ModelResult::from).collect(),
            model_failures: ctx.failures.clone(),
            attempts: ctx.attempts,
            max_attempts: ctx.max_attempts,
            is_valid: ctx.is_valid,
            validation_state: ctx.validation_state,
            accepted_on_exhaustion: ctx.accepted_on_exhaustion(),
            failed_criteria: ctx.failed_criteria.clone(),
            explanation: ctx.explanation.clone(),
            alert_tier: ctx.alert_tier,
            provenance: ctx.provenance.clone(),
            timings,
        }
    }

    /// The `n` most likely classes, highest first.
    pub fn top_classes(&self, n: usize) -> Vec<ClassProbability> {
        let mut all: Vec<ClassProbability> = self
            .distribution
            .iter()
            .map(|(k, &v)| ClassProbability::new(k.clone(), v))
            .collect();
        all.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        all.truncate(n);
        all
    }
}
