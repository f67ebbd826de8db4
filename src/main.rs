use wafer_inspector::canonical::{DieMap, RawInput};
use wafer_inspector::model::ModelRunner;
use wafer_inspector::types::DieState;
use wafer_inspector::{InspectionPipeline, PipelineParams};

fn main() {
    // Demo stub: a synthetic die map with a scratch, no models configured,
    // so the verdict comes from the tagged simulation fallback.
    let (rows, cols) = (26usize, 33usize);
    let mut map = DieMap::filled(rows, cols, DieState::Normal);
    for i in 4..22 {
        map.set(i, i + 4, DieState::Defect);
    }

    let runner = ModelRunner::new(Vec::new()).with_seed(7);
    let pipeline = InspectionPipeline::new(PipelineParams::default(), runner);
    let report = pipeline.inspect_input("synthetic", &RawInput::CategoricalMap(map));
    println!(
        "class={} confidence={:.3} simulated={} total_ms={:.3}",
        report.predicted_class, report.confidence, report.simulated, report.timings.total_ms
    );
}
