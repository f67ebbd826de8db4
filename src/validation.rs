//! Validator / Retry Controller.
//!
//! State machine
//! - `Pending` before the first evaluation.
//! - `Accepted` when consistency, confidence and the mismatch check all pass.
//! - `RejectedRetry` when a check fails and attempts remain; the caller runs
//!   inference again and re-evaluates.
//! - `Exhausted` when a check fails on the last attempt. The result is
//!   accepted anyway; only this state (or `attempts == max_attempts`) tells it
//!   apart from a genuine pass.
//!
//! The loop is synchronous and bounded, with no delay between attempts.
use crate::analysis::Analysis;
use crate::types::IssueFlag;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationParams {
    /// Consistency must be at least this.
    pub min_consistency: f32,
    /// Resolved confidence must be at least this.
    pub min_confidence: f32,
    /// Attempts before accepting on exhaustion (values below 1 act as 1).
    pub max_attempts: u32,
}

impl Default for ValidationParams {
    fn default() -> Self {
        Self {
            min_consistency: 0.6,
            min_confidence: 0.25,
            max_attempts: 3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationState {
    #[default]
    Pending,
    Accepted,
    RejectedRetry,
    Exhausted,
}

impl ValidationState {
    /// Terminal states are both accepted.
    pub fn is_valid(self) -> bool {
        matches!(self, ValidationState::Accepted | ValidationState::Exhausted)
    }
}

/// A validation criterion that did not hold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "criterion", rename_all = "snake_case")]
pub enum FailedCriterion {
    Consistency { score: f32, required: f32 },
    Confidence { confidence: f32, required: f32 },
    PredictionMismatch,
}

impl fmt::Display for FailedCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedCriterion::Consistency { score, required } => {
                write!(f, "consistency {score:.2} (need >= {required:.2})")
            }
            FailedCriterion::Confidence {
                confidence,
                required,
            } => write!(
                f,
                "confidence {:.1}% (need >= {:.0}%)",
                confidence * 100.0,
                required * 100.0
            ),
            FailedCriterion::PredictionMismatch => f.write_str("prediction mismatch"),
        }
    }
}

/// Check the three acceptance criteria; empty means acceptable.
pub fn check_criteria(
    analysis: &Analysis,
    confidence: f32,
    params: &ValidationParams,
) -> Vec<FailedCriterion> {
    let mut failed = Vec::new();
    if analysis.consistency_score < params.min_consistency {
        failed.push(FailedCriterion::Consistency {
            score: analysis.consistency_score,
            required: params.min_consistency,
        });
    }
    if confidence < params.min_confidence {
        failed.push(FailedCriterion::Confidence {
            confidence,
            required: params.min_confidence,
        });
    }
    if analysis.has_issue(IssueFlag::PredictionMismatch) {
        failed.push(FailedCriterion::PredictionMismatch);
    }
    failed
}

#[derive(Clone, Debug)]
pub struct RetryController {
    params: ValidationParams,
    attempts: u32,
    state: ValidationState,
    last_failed: Vec<FailedCriterion>,
}

impl RetryController {
    pub fn new(params: ValidationParams) -> Self {
        Self {
            params,
            attempts: 0,
            state: ValidationState::Pending,
            last_failed: Vec::new(),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.params.max_attempts.max(1)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn state(&self) -> ValidationState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.state.is_valid()
    }

    /// Criteria that failed on the latest attempt.
    pub fn last_failed(&self) -> &[FailedCriterion] {
        &self.last_failed
    }

    /// Count an attempt and evaluate it. Once terminal, further calls are
    /// no-ops and return the terminal state.
    pub fn evaluate(&mut self, analysis: &Analysis, confidence: f32) -> ValidationState {
        if self.state.is_valid() {
            return self.state;
        }
        self.attempts += 1;
        self.last_failed = check_criteria(analysis, confidence, &self.params);
        let max = self.max_attempts();
        self.state = if self.last_failed.is_empty() {
            ValidationState::Accepted
        } else if self.attempts < max {
            ValidationState::RejectedRetry
        } else {
            ValidationState::Exhausted
        };
        match self.state {
            ValidationState::Exhausted => warn!(
                "validation failed on attempt {}/{max} ({}); accepting current result",
                self.attempts,
                join(&self.last_failed)
            ),
            ValidationState::RejectedRetry => debug!(
                "validation attempt {}/{max} rejected: {}",
                self.attempts,
                join(&self.last_failed)
            ),
            _ => debug!("validation attempt {}/{max} accepted", self.attempts),
        }
        self.state
    }
}

fn join(failed: &[FailedCriterion]) -> String {
    failed
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
