//! Lot-level trend analysis over defect pattern counts.
//!
//! A pattern holding more than half of the lot's defects is treated as a
//! systematic process failure and mapped to a root-cause playbook.
//!
//! Photograph and die-map classifiers spell multi-word patterns differently
//! (`Edge_Ring` vs `Edge-Ring`); counts are merged under [`pattern_name`].
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DOMINANCE_THRESHOLD: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendVerdict {
    NoData,
    Stable,
    Systematic,
    Multiple,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub verdict: TrendVerdict,
    /// Patterns by count, highest first.
    pub ranked: Vec<(String, u64)>,
    pub dominant: Option<String>,
    pub dominance: f64,
    pub root_causes: Vec<String>,
    pub actions: Vec<String>,
    pub summary: String,
}

struct Playbook {
    causes: &'static [&'static str],
    actions: &'static [&'static str],
}

fn playbook(pattern: &str) -> Option<Playbook> {
    let book = match pattern {
        "Loc" => Playbook {
            causes: &[
                "Likely localized contamination in the deposition chamber.",
                "Possible particle source directly above the wafer chuck.",
            ],
            actions: &[
                "Inspect deposition chamber #3 walls for flaking.",
                "Check gas nozzle alignment.",
            ],
        },
        "Edge-Ring" => Playbook {
            causes: &[
                "Issue with Edge Bead Removal (EBR) process.",
                "Potential spin coater acceleration variance.",
            ],
            actions: &[
                "Calibrate EBR nozzle position.",
                "Verify spin-coat recipe step 2 (acceleration).",
            ],
        },
        "Scratch" => Playbook {
            causes: &[
                "Mechanical handling error.",
                "Robotic arm end-effector likely damaged.",
            ],
            actions: &[
                "STOP robot #4 for immediate inspection.",
                "Check cassette slots for alignment issues.",
            ],
        },
        "Donut" => Playbook {
            causes: &[
                "Thermal gradient issue during bake process.",
                "Cooling plate non-uniformity.",
            ],
            actions: &[
                "Check heater zones 1 & 2 on Bake Plate B.",
                "Verify cooling water flow rate.",
            ],
        },
        "Edge-Loc" => Playbook {
            causes: &[
                "Wafer handling machinery gripping too hard.",
                "Edge exclusion zone violation.",
            ],
            actions: &[
                "Adjust aligner grip pressure.",
                "Clean edge ring support pins.",
            ],
        },
        _ => return None,
    };
    Some(book)
}

const GENERAL_CAUSES: &[&str] = &[
    "Likely a general environment or multiple-tool drift.",
    "Possible cleanroom particle count spike.",
];
const GENERAL_ACTIONS: &[&str] = &[
    "Review daily particle counts.",
    "Check Preventive Maintenance (PM) schedules.",
];

/// Shared spelling of a defect pattern label: underscores become hyphens.
pub fn pattern_name(label: &str) -> String {
    label.trim().replace('_', "-")
}

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|s| s.to_string()).collect()
}

/// Classify a lot's defect distribution (pattern -> wafer count).
pub fn analyze_lot_trend(distribution: &BTreeMap<String, u64>) -> TrendAnalysis {
    let mut merged: BTreeMap<String, u64> = BTreeMap::new();
    for (label, count) in distribution {
        *merged.entry(pattern_name(label)).or_insert(0) += count;
    }
    let mut ranked: Vec<(String, u64)> = merged.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let total: u64 = ranked.iter().map(|(_, c)| c).sum();

    let mut analysis = TrendAnalysis {
        verdict: TrendVerdict::NoData,
        ranked,
        dominant: None,
        dominance: 0.0,
        root_causes: Vec::new(),
        actions: Vec::new(),
        summary: "No defect data available for analysis.".to_string(),
    };
    let Some((top, top_count)) = analysis.ranked.first().cloned() else {
        return analysis;
    };
    if total == 0 {
        analysis.verdict = TrendVerdict::Stable;
        analysis.summary = "No defects detected in this lot. Process is stable.".to_string();
        return analysis;
    }

    let share = top_count as f64 / total as f64;
    analysis.dominance = share;
    if share > DOMINANCE_THRESHOLD {
        analysis.verdict = TrendVerdict::Systematic;
        analysis.summary = format!(
            "SYSTEMATIC ISSUE DETECTED: '{top}'. This pattern accounts for {:.0}% of all defects.",
            share * 100.0
        );
        if let Some(book) = playbook(&top) {
            analysis.root_causes = owned(book.causes);
            analysis.actions = owned(book.actions);
        }
        analysis.dominant = Some(top);
    } else {
        let runner_up = analysis
            .ranked
            .get(1)
            .map(|(name, _)| name.as_str())
            .unwrap_or("");
        analysis.verdict = TrendVerdict::Multiple;
        analysis.summary = format!(
            "MULTIPLE DEFECT PATTERNS DETECTED. No single dominant cause. Top issues: {top}, {runner_up}"
        );
        analysis.root_causes = owned(GENERAL_CAUSES);
        analysis.actions = owned(GENERAL_ACTIONS);
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn empty_and_zero_lots() {
        let a = analyze_lot_trend(&BTreeMap::new());
        assert_eq!(a.verdict, TrendVerdict::NoData);
        let b = analyze_lot_trend(&dist(&[("Scratch", 0), ("Loc", 0)]));
        assert_eq!(b.verdict, TrendVerdict::Stable);
        assert!(b.actions.is_empty());
    }

    #[test]
    fn dominant_scratch_maps_to_robot_playbook() {
        let a = analyze_lot_trend(&dist(&[("Scratch", 7), ("Loc", 2), ("Donut", 1)]));
        assert_eq!(a.verdict, TrendVerdict::Systematic);
        assert_eq!(a.dominant.as_deref(), Some("Scratch"));
        assert!((a.dominance - 0.7).abs() < 1e-12);
        assert!(a.summary.contains("70%"));
        assert_eq!(a.actions[0], "STOP robot #4 for immediate inspection.");
    }

    #[test]
    fn exactly_half_is_not_dominant() {
        let a = analyze_lot_trend(&dist(&[("Edge-Ring", 5), ("Center", 3), ("Loc", 2)]));
        assert_eq!(a.verdict, TrendVerdict::Multiple);
        assert!(a.summary.ends_with("Top issues: Edge-Ring, Center"));
        assert_eq!(a.actions.len(), 2);
    }

    #[test]
    fn label_spellings_merge_into_one_pattern() {
        assert_eq!(pattern_name("Edge_Loc"), "Edge-Loc");
        let a = analyze_lot_trend(&dist(&[("Edge_Ring", 2), ("Edge-Ring", 2), ("Center", 3)]));
        assert_eq!(a.ranked[0], ("Edge-Ring".to_string(), 4));
        assert_eq!(a.ranked.len(), 2);
        assert_eq!(a.verdict, TrendVerdict::Systematic);
        assert_eq!(a.dominant.as_deref(), Some("Edge-Ring"));
        assert!(!a.actions.is_empty());
    }

    #[test]
    fn dominant_pattern_without_playbook_has_no_actions() {
        let a = analyze_lot_trend(&dist(&[("Near-full", 3)]));
        assert_eq!(a.verdict, TrendVerdict::Systematic);
        assert!(a.root_causes.is_empty());
        assert!(a.actions.is_empty());
    }
}
