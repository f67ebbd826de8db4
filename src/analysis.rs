//! Analyzer: significance ranking, consistency scoring and severity grading
//! of a resolved prediction.
//!
//! Consistency starts at 1.0 and each triggered check subtracts its penalty.
//! The score is not clamped below; it only feeds the `> pass_threshold`
//! recommendation gate and the validator.
use crate::model::ModelPrediction;
use crate::types::{ClassProbability, IssueFlag, Recommendation, Severity};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Non-no-defect classes above this probability are significant.
    pub significance_threshold: f32,
    /// Classes above this (and not significant) are minor.
    pub minor_threshold: f32,
    /// Confidence below this costs `low_confidence_penalty`.
    pub low_confidence: f32,
    /// Confidence below this (but not low) costs `moderate_confidence_penalty`.
    pub moderate_confidence: f32,
    pub low_confidence_penalty: f32,
    pub moderate_confidence_penalty: f32,
    /// More significant classes than this costs `multiple_defects_penalty`.
    pub max_significant: usize,
    pub multiple_defects_penalty: f32,
    /// Predicting no-defect with significant classes present costs this.
    pub mismatch_penalty: f32,
    /// Consistency strictly above this recommends PASS.
    pub pass_threshold: f32,
    /// Confidence strictly above this grades a defect High.
    pub high_severity: f32,
    /// Confidence strictly above this grades a defect Medium.
    pub medium_severity: f32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            significance_threshold: 0.10,
            minor_threshold: 0.05,
            low_confidence: 0.3,
            moderate_confidence: 0.5,
            low_confidence_penalty: 0.3,
            moderate_confidence_penalty: 0.1,
            max_significant: 2,
            multiple_defects_penalty: 0.2,
            mismatch_penalty: 0.3,
            pass_threshold: 0.6,
            high_severity: 0.8,
            medium_severity: 0.5,
        }
    }
}

/// Analyzer output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Significant defect classes, highest probability first.
    pub significant: Vec<ClassProbability>,
    /// Defect classes in `(minor, significance]`, diagnostics only.
    pub minor: Vec<ClassProbability>,
    pub consistency_score: f32,
    pub issues: Vec<IssueFlag>,
    pub severity: Severity,
    pub recommendation: Recommendation,
}

impl Analysis {
    pub fn has_issue(&self, flag: IssueFlag) -> bool {
        self.issues.contains(&flag)
    }
}

pub fn analyze(prediction: &ModelPrediction, params: &AnalysisParams) -> Analysis {
    let confidence = prediction.confidence();
    let labels = &prediction.labels;

    let mut significant = Vec::new();
    let mut minor = Vec::new();
    for (label, &p) in labels.labels().iter().zip(&prediction.probabilities) {
        if labels.is_no_defect(label) {
            continue;
        }
        if p > params.significance_threshold {
            significant.push(ClassProbability::new(label.clone(), p));
        } else if p > params.minor_threshold {
            minor.push(ClassProbability::new(label.clone(), p));
        }
    }
    // Stable: equal probabilities keep label order.
    significant.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let mut score = 1.0f32;
    let mut issues = Vec::new();
    if confidence < params.low_confidence {
        score -= params.low_confidence_penalty;
        issues.push(IssueFlag::LowConfidence);
    } else if confidence < params.moderate_confidence {
        score -= params.moderate_confidence_penalty;
    }
    if significant.len() > params.max_significant {
        score -= params.multiple_defects_penalty;
        issues.push(IssueFlag::MultipleDefects);
    }
    if !prediction.has_defect() && !significant.is_empty() {
        score -= params.mismatch_penalty;
        issues.push(IssueFlag::PredictionMismatch);
    }

    let severity = grade_severity(prediction.has_defect(), confidence, params);
    let recommendation = if score > params.pass_threshold {
        Recommendation::Pass
    } else {
        Recommendation::NeedsReview
    };
    debug!(
        "analysis: significant={} minor={} consistency={:.2} issues={:?} severity={} -> {}",
        significant.len(),
        minor.len(),
        score,
        issues,
        severity,
        recommendation
    );

    Analysis {
        significant,
        minor,
        consistency_score: score,
        issues,
        severity,
        recommendation,
    }
}

pub fn grade_severity(has_defect: bool, confidence: f32, params: &AnalysisParams) -> Severity {
    if !has_defect {
        Severity::None
    } else if confidence > params.high_severity {
        Severity::High
    } else if confidence > params.medium_severity {
        Severity::Medium
    } else {
        Severity::Low
    }
}
