//! Inspection pipeline orchestrating the detection stages end to end.
//!
//! Stages
//! - Canonicalize: decode the raw input and build the canonical tensor.
//! - Run models: route the tensor to the configured classifiers.
//! - Resolve ensemble: pick the most confident prediction (simulation when
//!   nothing answered).
//! - Analyze: significance ranking, consistency score, severity.
//! - Validate: accept, or loop back to the models until the attempt cap;
//!   the last attempt is accepted regardless.
//! - Explain: narrative and alert tier.
//!
//! Each inspection owns its [`InspectionContext`]; only the model cache inside
//! the runner is shared, which makes [`InspectionPipeline::inspect_batch`]
//! safe to fan out on rayon.
//!
//! ```no_run
//! use wafer_inspector::model::{load_manifests, ModelRunner};
//! use wafer_inspector::{InspectionPipeline, PipelineParams};
//! use std::path::{Path, PathBuf};
//!
//! # fn main() -> wafer_inspector::Result<()> {
//! let (manifests, _skipped) = load_manifests(&[PathBuf::from("models/diemap.json")]);
//! let pipeline = InspectionPipeline::new(PipelineParams::default(), ModelRunner::new(manifests));
//! let report = pipeline.inspect(Path::new("lot7/wafer_03.npy"))?;
//! println!("{} ({:.1}%)", report.predicted_class, report.confidence * 100.0);
//! # Ok(())
//! # }
//! ```

mod context;
mod params;
mod report;

pub use context::InspectionContext;
pub use params::PipelineParams;
pub use report::{InspectionReport, ModelResult};

use crate::analysis::analyze;
use crate::canonical::{Canonicalizer, PhotographRoute, RawInput};
use crate::diagnostics::{StageTiming, TimingBreakdown};
use crate::ensemble::{resolve, Resolution};
use crate::error::Result;
use crate::explain::explain;
use crate::model::{ModelPrediction, ModelRunner};
use crate::types::InputKind;
use crate::validation::{RetryController, ValidationState};
use log::{debug, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

pub struct InspectionPipeline {
    params: PipelineParams,
    canonicalizer: Canonicalizer,
    runner: ModelRunner,
}

impl InspectionPipeline {
    pub fn new(params: PipelineParams, runner: ModelRunner) -> Self {
        let canonicalizer = Canonicalizer::new(params.canonical.clone(), params.die_grid.clone());
        Self {
            params,
            canonicalizer,
            runner,
        }
    }

    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    pub fn runner(&self) -> &ModelRunner {
        &self.runner
    }

    /// Photographs go to the whole-image classifier when one is configured,
    /// otherwise through the die grid when die-map models exist.
    pub fn photograph_route(&self) -> PhotographRoute {
        if self.runner.has_models_for(InputKind::Photograph) {
            PhotographRoute::WholeImage
        } else if self.runner.has_models_for(InputKind::CategoricalMap) {
            PhotographRoute::DieGrid
        } else {
            PhotographRoute::WholeImage
        }
    }

    /// Inspect a file. Only input errors are returned; model trouble yields
    /// a degraded but complete report.
    pub fn inspect(&self, path: &Path) -> Result<InspectionReport> {
        let start = Instant::now();
        let raw = RawInput::load(path)?;
        let load_ms = elapsed_ms(start);
        let mut report = self.inspect_input(&path.display().to_string(), &raw);
        report.timings.stages.insert(0, StageTiming::new("load", load_ms));
        report.timings.total_ms += load_ms;
        Ok(report)
    }

    /// Inspect several files concurrently; results keep input order.
    pub fn inspect_batch(&self, paths: &[PathBuf]) -> Vec<Result<InspectionReport>> {
        paths.par_iter().map(|p| self.inspect(p)).collect()
    }

    /// Inspect already-decoded input.
    pub fn inspect_input(&self, source: &str, raw: &RawInput) -> InspectionReport {
        let total = Instant::now();
        let mut timings = TimingBreakdown::default();
        let mut ctx =
            InspectionContext::new(source, raw.kind(), self.params.validation.max_attempts);

        let t = Instant::now();
        self.canonicalize(&mut ctx, raw);
        timings.push("canonicalize", elapsed_ms(t));

        let mut controller = RetryController::new(self.params.validation.clone());
        loop {
            let attempt = controller.attempts() + 1;

            let t = Instant::now();
            let predictions = self.run_models(&mut ctx);
            timings.push(format!("models#{attempt}"), elapsed_ms(t));

            let t = Instant::now();
            self.resolve_ensemble(&mut ctx, predictions);
            timings.push(format!("ensemble#{attempt}"), elapsed_ms(t));

            let t = Instant::now();
            self.analyze(&mut ctx);
            timings.push(format!("analysis#{attempt}"), elapsed_ms(t));

            if self.validate(&mut ctx, &mut controller) != ValidationState::RejectedRetry {
                break;
            }
        }

        let t = Instant::now();
        self.explain(&mut ctx);
        timings.push("explain", elapsed_ms(t));
        timings.total_ms = elapsed_ms(total);

        info!(
            "{}: {} ({:.1}%) severity={} attempts={}/{} via {}",
            ctx.source,
            ctx.predicted_class,
            ctx.confidence * 100.0,
            ctx.analysis.severity,
            ctx.attempts,
            ctx.max_attempts,
            ctx.resolved_by
        );
        InspectionReport::from_context(&ctx, timings)
    }

    pub fn canonicalize(&self, ctx: &mut InspectionContext, raw: &RawInput) {
        let route = self.photograph_route();
        let canonical = self.canonicalizer.canonicalize(raw, route);
        ctx.source_kind = canonical.source_kind;
        ctx.tensor = canonical.tensor;
        ctx.provenance = canonical.provenance;
    }

    /// Run the routed models; failures are recorded on the context.
    pub fn run_models(&self, ctx: &mut InspectionContext) -> Vec<ModelPrediction> {
        let outcome = self.runner.run(&ctx.tensor);
        ctx.failures = outcome.failures;
        outcome.predictions
    }

    pub fn resolve_ensemble(
        &self,
        ctx: &mut InspectionContext,
        predictions: Vec<ModelPrediction>,
    ) -> Resolution {
        let kind = ctx.tensor.kind;
        let reason = if self.runner.targets(kind).is_empty() {
            "No Models Configured"
        } else {
            "Models Failed"
        };
        let resolution = resolve(predictions, || {
            self.runner.simulate(self.runner.fallback_labels(kind), reason)
        });
        ctx.apply_resolution(&resolution);
        resolution
    }

    pub fn analyze(&self, ctx: &mut InspectionContext) {
        if let Some(chosen) = &ctx.chosen {
            ctx.analysis = analyze(chosen, &self.params.analysis);
        }
    }

    pub fn validate(
        &self,
        ctx: &mut InspectionContext,
        controller: &mut RetryController,
    ) -> ValidationState {
        let state = controller.evaluate(&ctx.analysis, ctx.confidence);
        ctx.attempts = controller.attempts();
        ctx.max_attempts = controller.max_attempts();
        ctx.validation_state = state;
        ctx.failed_criteria = controller.last_failed().to_vec();
        ctx.is_valid = controller.is_valid();
        debug!("validation state after attempt {}: {:?}", ctx.attempts, state);
        state
    }

    pub fn explain(&self, ctx: &mut InspectionContext) {
        let explanation = explain(ctx);
        ctx.explanation = explanation.narrative;
        ctx.alert_tier = explanation.tier;
    }
}
