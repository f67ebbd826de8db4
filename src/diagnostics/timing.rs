use serde::{Deserialize, Serialize};

/// Wall-clock time spent in one pipeline stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub label: String,
    pub elapsed_ms: f64,
}

impl StageTiming {
    pub fn new(label: impl Into<String>, elapsed_ms: f64) -> Self {
        Self {
            label: label.into(),
            elapsed_ms,
        }
    }
}

/// Timing trace for one inspection, stages in execution order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: impl Into<String>, elapsed_ms: f64) {
        self.stages.push(StageTiming::new(label, elapsed_ms));
    }

    /// Number of times a stage with this base label ran (`models`,
    /// `models#2`, ... all count as `models`).
    pub fn runs_of(&self, stage: &str) -> usize {
        self.stages
            .iter()
            .filter(|s| s.label.split('#').next() == Some(stage))
            .count()
    }

    /// Sum of every stage's elapsed time.
    pub fn stage_sum_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_attempt_suffixed_runs() {
        let mut t = TimingBreakdown::default();
        t.push("canonicalize", 1.0);
        t.push("models#1", 2.0);
        t.push("models#2", 3.0);
        t.push("explain", 0.5);
        assert_eq!(t.runs_of("models"), 2);
        assert_eq!(t.runs_of("canonicalize"), 1);
        assert_eq!(t.runs_of("analysis"), 0);
        assert!((t.stage_sum_ms() - 6.5).abs() < 1e-9);
    }
}
