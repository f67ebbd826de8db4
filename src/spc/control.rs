//! Shewhart control limits and Western Electric run rules.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Control limits as used on a defect-rate chart.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlLimits {
    pub ucl: f64,
    pub lcl: f64,
    pub cl: f64,
    pub std_dev: f64,
    pub data_points: usize,
}

impl ControlLimits {
    /// Limits used until at least two observations exist.
    pub fn placeholder(data_points: usize) -> Self {
        Self {
            ucl: 100.0,
            lcl: 0.0,
            cl: 50.0,
            std_dev: 0.0,
            data_points,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Mean ± `sigma`·(sample std). LCL never goes below zero.
pub fn control_limits(values: &[f64], sigma: f64) -> ControlLimits {
    let n = values.len();
    if n < 2 {
        return ControlLimits::placeholder(n);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    let std_dev = var.sqrt();
    ControlLimits {
        ucl: round2(mean + sigma * std_dev),
        lcl: round2((mean - sigma * std_dev).max(0.0)),
        cl: round2(mean),
        std_dev: round2(std_dev),
        data_points: n,
    }
}

/// One observation on the chart.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpcPoint {
    pub label: String,
    #[serde(default)]
    pub value: f64,
}

impl SpcPoint {
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Medium,
    High,
    Critical,
}

impl fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleSeverity::Medium => "medium",
            RuleSeverity::High => "high",
            RuleSeverity::Critical => "critical",
        })
    }
}

/// The four Western Electric rules, numbered as on the shop floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WesternElectricRule {
    BeyondLimits,
    TwoOfThreeBeyond2Sigma,
    FourOfFiveBeyond1Sigma,
    EightSameSide,
}

impl WesternElectricRule {
    pub fn number(self) -> u8 {
        match self {
            WesternElectricRule::BeyondLimits => 1,
            WesternElectricRule::TwoOfThreeBeyond2Sigma => 2,
            WesternElectricRule::FourOfFiveBeyond1Sigma => 3,
            WesternElectricRule::EightSameSide => 4,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            WesternElectricRule::BeyondLimits => "Point beyond control limits (3σ)",
            WesternElectricRule::TwoOfThreeBeyond2Sigma => "2 of 3 points beyond 2σ",
            WesternElectricRule::FourOfFiveBeyond1Sigma => "4 of 5 points beyond 1σ",
            WesternElectricRule::EightSameSide => "8 consecutive points on same side",
        }
    }

    pub fn severity(self) -> RuleSeverity {
        match self {
            WesternElectricRule::BeyondLimits => RuleSeverity::Critical,
            WesternElectricRule::TwoOfThreeBeyond2Sigma => RuleSeverity::High,
            _ => RuleSeverity::Medium,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    OutOfControl,
    /// Between 2σ and the control limits.
    ZoneA,
    /// Between 1σ and 2σ.
    ZoneB,
    /// Within 1σ of the center line.
    ZoneC,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointAnalysis {
    pub label: String,
    pub value: f64,
    pub violations: Vec<WesternElectricRule>,
    pub is_out_of_control: bool,
    pub zone: Zone,
}

struct Bands {
    a_upper: f64,
    a_lower: f64,
    b_upper: f64,
    b_lower: f64,
}

impl Bands {
    fn new(limits: &ControlLimits) -> Self {
        Self {
            a_upper: limits.cl + 2.0 * limits.std_dev,
            a_lower: limits.cl - 2.0 * limits.std_dev,
            b_upper: limits.cl + limits.std_dev,
            b_lower: limits.cl - limits.std_dev,
        }
    }
}

/// `at_least` of the window lies strictly above `upper` or strictly below
/// `lower` (counted per side).
fn one_sided(window: &[f64], upper: f64, lower: f64, at_least: usize) -> bool {
    let above = window.iter().filter(|v| **v > upper).count();
    let below = window.iter().filter(|v| **v < lower).count();
    above >= at_least || below >= at_least
}

fn zone_of(value: f64, limits: &ControlLimits, bands: &Bands) -> Zone {
    if value > limits.ucl || value < limits.lcl {
        Zone::OutOfControl
    } else if value > bands.a_upper || value < bands.a_lower {
        Zone::ZoneA
    } else if value > bands.b_upper || value < bands.b_lower {
        Zone::ZoneB
    } else {
        Zone::ZoneC
    }
}

/// Evaluate every point against the four rules. Windows only look backwards,
/// so early points can only trip the rules their history allows.
pub fn apply_western_electric_rules(
    points: &[SpcPoint],
    limits: &ControlLimits,
) -> Vec<PointAnalysis> {
    let bands = Bands::new(limits);
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let value = point.value;
            let mut violations = Vec::new();
            if value > limits.ucl || value < limits.lcl {
                violations.push(WesternElectricRule::BeyondLimits);
            }
            if i >= 2 && one_sided(&values[i - 2..=i], bands.a_upper, bands.a_lower, 2) {
                violations.push(WesternElectricRule::TwoOfThreeBeyond2Sigma);
            }
            if i >= 4 && one_sided(&values[i - 4..=i], bands.b_upper, bands.b_lower, 4) {
                violations.push(WesternElectricRule::FourOfFiveBeyond1Sigma);
            }
            if i >= 7 {
                let run = &values[i - 7..=i];
                if run.iter().all(|v| *v > limits.cl) || run.iter().all(|v| *v < limits.cl) {
                    violations.push(WesternElectricRule::EightSameSide);
                }
            }
            PointAnalysis {
                label: point.label.clone(),
                value,
                is_out_of_control: !violations.is_empty(),
                violations,
                zone: zone_of(value, limits, &bands),
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStability {
    Stable,
    Warning,
    Unstable,
}

impl fmt::Display for ProcessStability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProcessStability::Stable => "stable",
            ProcessStability::Warning => "warning",
            ProcessStability::Unstable => "unstable",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpcSummary {
    pub total_points: usize,
    pub out_of_control_count: usize,
    /// Percentage, two decimals.
    pub out_of_control_rate: f64,
    /// Keyed by rule number.
    pub rule_violations: BTreeMap<u8, usize>,
    pub process_stability: ProcessStability,
}

pub fn summarize(analyzed: &[PointAnalysis]) -> SpcSummary {
    let total_points = analyzed.len();
    let flagged: Vec<&PointAnalysis> = analyzed.iter().filter(|p| p.is_out_of_control).collect();
    let mut rule_violations = BTreeMap::new();
    for rule in flagged.iter().flat_map(|p| p.violations.iter()) {
        *rule_violations.entry(rule.number()).or_insert(0) += 1;
    }
    let count = flagged.len();
    let out_of_control_rate = if total_points > 0 {
        round2(count as f64 / total_points as f64 * 100.0)
    } else {
        0.0
    };
    let process_stability = match count {
        0 => ProcessStability::Stable,
        1 | 2 => ProcessStability::Warning,
        _ => ProcessStability::Unstable,
    };
    SpcSummary {
        total_points,
        out_of_control_count: count,
        out_of_control_rate,
        rule_violations,
        process_stability,
    }
}
