use std::env;
use std::path::Path;
use wafer_inspector::config::spc::load_history;
use wafer_inspector::spc::{
    apply_western_electric_rules, control_limits, summarize, Zone, DEFAULT_SIGMA,
};

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn usage() -> String {
    "Usage: spc_report <history.json> [sigma]".to_string()
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let history_path = args.next().ok_or_else(usage)?;
    let sigma = match args.next() {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|e| format!("Invalid sigma '{raw}': {e}"))?,
        None => DEFAULT_SIGMA,
    };

    let points = load_history(Path::new(&history_path))?;
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let limits = control_limits(&values, sigma);
    let analyzed = apply_western_electric_rules(&points, &limits);
    let summary = summarize(&analyzed);

    println!("Control limits ({sigma}σ, {} points)", limits.data_points);
    println!("  UCL: {:.2}", limits.ucl);
    println!("  CL:  {:.2}", limits.cl);
    println!("  LCL: {:.2}", limits.lcl);
    println!("  std: {:.2}", limits.std_dev);

    println!("\nPoints");
    for point in &analyzed {
        let zone = match point.zone {
            Zone::OutOfControl => "OOC",
            Zone::ZoneA => "A",
            Zone::ZoneB => "B",
            Zone::ZoneC => "C",
        };
        let flags: Vec<String> = point
            .violations
            .iter()
            .map(|rule| format!("rule {} ({}, {})", rule.number(), rule.description(), rule.severity()))
            .collect();
        println!(
            "  {:<16} {:>8.2}  zone {:<3} {}",
            point.label,
            point.value,
            zone,
            flags.join("; ")
        );
    }

    println!("\nSummary");
    println!(
        "  out of control: {}/{} ({:.2}%)",
        summary.out_of_control_count, summary.total_points, summary.out_of_control_rate
    );
    for (rule, count) in &summary.rule_violations {
        println!("  rule {rule}: {count}");
    }
    println!("  process stability: {}", summary.process_stability);
    Ok(())
}
