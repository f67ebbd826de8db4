//! Explainer: deterministic narrative and alert tier for a finished
//! inspection.
//!
//! Section order is fixed: verdict, significant findings, consistency and
//! validation notes, top-5 probability breakdown (defects only), then the
//! severity-tiered recommendation. Missing upstream values render as
//! placeholders; this stage never fails.
use crate::pipeline::InspectionContext;
use crate::types::{IssueFlag, Severity};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const BREAKDOWN_ROWS: usize = 5;
const BAR_WIDTH: f32 = 15.0;

/// Alert action level handed to the notification collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertTier {
    /// High severity: stop the line.
    Immediate,
    /// Medium severity: quality review.
    Review,
    /// Low severity: log for monitoring.
    Monitor,
    /// No defect.
    #[default]
    Approved,
}

impl AlertTier {
    pub fn from_severity(has_defect: bool, severity: Severity) -> Self {
        if !has_defect {
            return AlertTier::Approved;
        }
        match severity {
            Severity::High => AlertTier::Immediate,
            Severity::Medium => AlertTier::Review,
            Severity::Low | Severity::None => AlertTier::Monitor,
        }
    }

    /// Actions the alerting side should take.
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            AlertTier::Immediate => &[
                "Stop production line for inspection",
                "Flag wafer for immediate review",
                "Notify Quality Control team",
            ],
            AlertTier::Review => &[
                "Mark wafer for quality review",
                "Continue production with monitoring",
                "Log for trend analysis",
            ],
            AlertTier::Monitor => &[
                "Log defect for monitoring",
                "Continue normal operation",
                "Review in next batch analysis",
            ],
            AlertTier::Approved => &["Continue normal operation"],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub narrative: String,
    pub tier: AlertTier,
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

pub fn explain(ctx: &InspectionContext) -> Explanation {
    let mut out = String::new();
    let source = or_placeholder(&ctx.source, "unknown input");
    let label = or_placeholder(&ctx.predicted_class, "Unknown");
    let severity = ctx.analysis.severity;

    // Verdict
    if ctx.has_defect {
        let _ = writeln!(out, "DEFECT DETECTED on wafer from '{source}'");
        let _ = writeln!(out);
        let _ = writeln!(out, "Primary Defect Type: {label}");
        let _ = writeln!(out, "Confidence Level: {:.1}%", ctx.confidence * 100.0);
        let _ = writeln!(out, "Severity Assessment: {severity}");
    } else {
        let _ = writeln!(out, "NO DEFECTS DETECTED on wafer from '{source}'");
        let _ = writeln!(out, "Confidence Level: {:.1}%", ctx.confidence * 100.0);
    }
    if ctx.simulated {
        let _ = writeln!(
            out,
            "Source: {} - no trained model produced this result; treat it as untrusted.",
            or_placeholder(&ctx.resolved_by, "Simulation")
        );
    } else if !ctx.resolved_by.is_empty() {
        let _ = writeln!(out, "Source: {}", ctx.resolved_by);
    }

    // Findings
    if !ctx.analysis.significant.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Detailed Findings:");
        for (i, issue) in ctx.analysis.significant.iter().enumerate() {
            let _ = writeln!(
                out,
                "   {}. {}: {:.1}% probability",
                i + 1,
                issue.class,
                issue.probability * 100.0
            );
        }
    }

    // Consistency and validation notes
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Analysis Quality: {:.0}% consistency",
        ctx.analysis.consistency_score * 100.0
    );
    let mut notes: Vec<String> = ctx
        .analysis
        .issues
        .iter()
        .map(|issue| {
            match issue {
                IssueFlag::LowConfidence => "Model showed uncertainty in prediction",
                IssueFlag::MultipleDefects => "Multiple defect types may be present",
                IssueFlag::PredictionMismatch => "Some inconsistency detected in results",
            }
            .to_string()
        })
        .collect();
    if ctx.accepted_on_exhaustion() {
        notes.push(format!(
            "Accepted after exhausting {}/{} validation attempts",
            ctx.attempts, ctx.max_attempts
        ));
    } else if ctx.attempts > 1 {
        notes.push(format!(
            "Validated on attempt {}/{}",
            ctx.attempts, ctx.max_attempts
        ));
    }
    if !notes.is_empty() {
        let _ = writeln!(out, "Notes:");
        for note in &notes {
            let _ = writeln!(out, "   - {note}");
        }
    }

    // Breakdown
    if ctx.has_defect && !ctx.distribution.is_empty() {
        let mut sorted: Vec<(&String, &f32)> = ctx.distribution.iter().collect();
        sorted.sort_by(|a, b| b.1.total_cmp(a.1));
        let _ = writeln!(out);
        let _ = writeln!(out, "Full Probability Breakdown:");
        for (class, &p) in sorted.into_iter().take(BREAKDOWN_ROWS) {
            let bar = "#".repeat((p * BAR_WIDTH) as usize);
            let _ = writeln!(out, "   {class:12}: {:5.1}% {bar}", p * 100.0);
        }
    }

    // Recommendation
    let tier = AlertTier::from_severity(ctx.has_defect, severity);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "-".repeat(40));
    let (headline, detail) = match tier {
        AlertTier::Immediate => (
            "RECOMMENDATION: IMMEDIATE ACTION REQUIRED",
            "This wafer should be flagged for manual inspection.",
        ),
        AlertTier::Review => (
            "RECOMMENDATION: REVIEW NEEDED",
            "This wafer should be marked for quality review.",
        ),
        AlertTier::Monitor => (
            "RECOMMENDATION: LOG FOR MONITORING",
            "Minor issue detected - log for trend analysis.",
        ),
        AlertTier::Approved => (
            "RECOMMENDATION: WAFER APPROVED",
            "No defects detected - wafer passes inspection.",
        ),
    };
    let _ = writeln!(out, "{headline}");
    let _ = write!(out, "   {detail}");

    Explanation {
        narrative: out,
        tier,
    }
}
