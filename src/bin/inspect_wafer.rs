use log::warn;
use serde::Serialize;
use std::env;
use std::path::Path;
use wafer_inspector::config::inspect::{self, OutputFormat, RuntimeConfig};
use wafer_inspector::image::io::write_json_file;
use wafer_inspector::model::{load_manifests, ModelFailure, ModelRunner};
use wafer_inspector::spc::{
    analyze_lot_trend, apply_western_electric_rules, control_limits, defect_distribution,
    defect_rate_series, summarize, TrendAnalysis, DEFAULT_SIGMA,
};
use wafer_inspector::{InspectionPipeline, InspectionReport};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn usage() -> String {
    "Usage: inspect_wafer <config.json>".to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchOutput<'a> {
    reports: &'a [InspectionReport],
    errors: Vec<InputFailure>,
    skipped_models: &'a [ModelFailure],
    #[serde(skip_serializing_if = "Option::is_none")]
    trend: Option<TrendAnalysis>,
}

#[derive(Serialize)]
struct InputFailure {
    input: String,
    error: String,
}

fn run() -> Result<(), String> {
    let config_path = env::args().nth(1).ok_or_else(usage)?;
    let config = inspect::load_config(Path::new(&config_path))?;

    let (manifests, skipped_models) = load_manifests(&config.models);
    let mut runner = ModelRunner::new(manifests);
    if let Some(seed) = config.seed {
        runner = runner.with_seed(seed);
    }
    let pipeline = InspectionPipeline::new(config.params.clone(), runner);

    let results = pipeline.inspect_batch(&config.inputs);
    let mut reports = Vec::new();
    let mut errors = Vec::new();
    for (path, result) in config.inputs.iter().zip(results) {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => {
                warn!("{}: {err}", path.display());
                errors.push(InputFailure {
                    input: path.display().to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    let trend = config
        .spc_window
        .map(|_| analyze_lot_trend(&defect_distribution(&reports)));

    if config.output.format.includes_text() {
        for failure in &skipped_models {
            println!("Skipped model {}: {}", failure.model_id, failure.reason);
        }
        for report in &reports {
            print_text_summary(report);
        }
        for failure in &errors {
            println!("\n{}: FAILED ({})", failure.input, failure.error);
        }
        if let Some(window) = config.spc_window {
            print_lot_summary(&config, &reports, window, trend.as_ref());
        }
    }

    if config.output.format.includes_json() {
        let output = BatchOutput {
            reports: &reports,
            errors,
            skipped_models: &skipped_models,
            trend,
        };
        if let Some(path) = &config.output.json_out {
            write_json_file(path, &output)?;
            if config.output.format.includes_text() {
                println!("\nJSON report written to {}", path.display());
            } else {
                println!("JSON report written to {}", path.display());
            }
        } else {
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| format!("Failed to serialize JSON: {e}"))?;
            if config.output.format == OutputFormat::Both {
                println!("\nJSON report:\n{json}");
            } else {
                println!("{json}");
            }
        }
    }

    Ok(())
}

fn print_text_summary(report: &InspectionReport) {
    println!("\n{} [{}]", report.source, report.source_kind);
    println!(
        "  verdict: {} ({:.1}%) via {}",
        report.predicted_class,
        report.confidence * 100.0,
        report.resolved_by
    );
    println!(
        "  severity: {}  recommendation: {}  consistency: {:.2}",
        report.severity, report.recommendation, report.consistency_score
    );
    println!(
        "  attempts: {}/{}  state: {:?}{}",
        report.attempts,
        report.max_attempts,
        report.validation_state,
        if report.accepted_on_exhaustion {
            " (accepted on exhaustion)"
        } else {
            ""
        }
    );
    for result in &report.individual_results {
        println!(
            "    {}: {} ({:.1}%){}",
            result.model,
            result.prediction,
            result.confidence * 100.0,
            if result.simulated { " [simulated]" } else { "" }
        );
    }
    for failure in &report.model_failures {
        println!("    {}: failed ({})", failure.model_id, failure.reason);
    }
    println!("  alert: {:?}", report.alert_tier);
    println!("  timings (ms): total={:.3}", report.timings.total_ms);
    println!();
    for line in report.explanation.lines() {
        println!("  {line}");
    }
}

fn print_lot_summary(
    config: &RuntimeConfig,
    reports: &[InspectionReport],
    window: usize,
    trend: Option<&TrendAnalysis>,
) {
    let series = defect_rate_series(reports, window);
    let values: Vec<f64> = series.iter().map(|p| p.value).collect();
    let limits = control_limits(&values, DEFAULT_SIGMA);
    let analyzed = apply_western_electric_rules(&series, &limits);
    let summary = summarize(&analyzed);

    println!("\nLot summary ({} inputs)", config.inputs.len());
    println!(
        "  defect rate chart: CL={:.2} UCL={:.2} LCL={:.2} ({} windows of {})",
        limits.cl, limits.ucl, limits.lcl, limits.data_points, window
    );
    println!(
        "  out of control: {}/{} ({:.2}%) -> {}",
        summary.out_of_control_count,
        summary.total_points,
        summary.out_of_control_rate,
        summary.process_stability
    );
    if let Some(trend) = trend {
        println!("  trend: {}", trend.summary);
        for cause in &trend.root_causes {
            println!("    cause: {cause}");
        }
        for (i, action) in trend.actions.iter().enumerate() {
            println!("    {}. {action}", i + 1);
        }
    }
}
