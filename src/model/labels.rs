//! Per-model class-label tables.
//!
//! Every classifier owns its label order. Tables are shared through `Arc`
//! together with the model's output, never looked up globally, so a vector
//! produced by one model is always decoded with that model's own labels.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Label order of the die-map classifiers.
pub const DIE_MAP_LABELS: [&str; 9] = [
    "Center",
    "Donut",
    "Edge-Loc",
    "Edge-Ring",
    "Loc",
    "Near-full",
    "Random",
    "Scratch",
    "none",
];

/// Label order of the whole-image photograph classifier.
pub const PHOTOGRAPH_LABELS: [&str; 9] = [
    "Center",
    "Donut",
    "Edge_Loc",
    "Edge_Ring",
    "Loc",
    "Near_Full",
    "Normal",
    "Random",
    "Scratch",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTable {
    labels: Vec<String>,
    no_defect: String,
}

impl LabelTable {
    /// Build a table; the no-defect label must be one of `labels` and labels
    /// must be unique.
    pub fn new(labels: Vec<String>, no_defect: impl Into<String>) -> Result<Self, String> {
        let no_defect = no_defect.into();
        if labels.is_empty() {
            return Err("label table is empty".to_string());
        }
        if !labels.contains(&no_defect) {
            return Err(format!("no-defect label '{no_defect}' is not in the label list"));
        }
        for (i, label) in labels.iter().enumerate() {
            if labels[..i].contains(label) {
                return Err(format!("duplicate label '{label}'"));
            }
        }
        Ok(Self { labels, no_defect })
    }

    pub fn die_map() -> Self {
        Self {
            labels: DIE_MAP_LABELS.iter().map(|s| s.to_string()).collect(),
            no_defect: "none".to_string(),
        }
    }

    pub fn photograph() -> Self {
        Self {
            labels: PHOTOGRAPH_LABELS.iter().map(|s| s.to_string()).collect(),
            no_defect: "Normal".to_string(),
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn no_defect(&self) -> &str {
        &self.no_defect
    }

    pub fn is_no_defect(&self, label: &str) -> bool {
        label == self.no_defect
    }
}
