use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of raw input (or canonical tensor) flowing through the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputKind {
    /// 2D array of {background, normal, defect} die states.
    CategoricalMap,
    /// Raster photograph of a wafer.
    Photograph,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::CategoricalMap => f.write_str("categorical-map"),
            InputKind::Photograph => f.write_str("photograph"),
        }
    }
}

/// State of a single die on a categorical wafer map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DieState {
    #[default]
    Background = 0,
    Normal = 1,
    Defect = 2,
}

impl DieState {
    /// Map a raw die-map value onto a state; anything outside {0, 1, 2} is illegal.
    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(DieState::Background),
            1 => Some(DieState::Normal),
            2 => Some(DieState::Defect),
            _ => None,
        }
    }

    /// RGB channel that carries this state in the canonical encoding.
    #[inline]
    pub fn channel(self) -> usize {
        self as usize
    }
}

/// Severity grade, ordered from least to most severe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::None => "None",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        };
        f.write_str(s)
    }
}

/// Analyzer recommendation derived from the consistency score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Pass,
    #[default]
    NeedsReview,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::Pass => f.write_str("PASS"),
            Recommendation::NeedsReview => f.write_str("NEEDS_REVIEW"),
        }
    }
}

/// Named issue flags raised by the consistency checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueFlag {
    LowConfidence,
    MultipleDefects,
    PredictionMismatch,
}

impl fmt::Display for IssueFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueFlag::LowConfidence => "low_confidence",
            IssueFlag::MultipleDefects => "multiple_defects",
            IssueFlag::PredictionMismatch => "prediction_mismatch",
        };
        f.write_str(s)
    }
}

/// A `(class, probability)` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassProbability {
    pub class: String,
    pub probability: f32,
}

impl ClassProbability {
    pub fn new(class: impl Into<String>, probability: f32) -> Self {
        Self {
            class: class.into(),
            probability,
        }
    }
}
