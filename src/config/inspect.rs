use crate::pipeline::PipelineParams;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Both,
}

impl OutputFormat {
    pub fn includes_text(self) -> bool {
        matches!(self, OutputFormat::Text | OutputFormat::Both)
    }

    pub fn includes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_out: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Runtime configuration of the `inspect_wafer` binary.
#[derive(Clone, Debug, Deserialize)]
pub struct RuntimeConfig {
    /// `.npy` die maps and/or PNG/JPEG photographs.
    pub inputs: Vec<PathBuf>,
    /// Model manifest files, in routing order.
    #[serde(default)]
    pub models: Vec<PathBuf>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub params: PipelineParams,
    /// Seeds the simulation fallback.
    #[serde(default)]
    pub seed: Option<u64>,
    /// When set, batch results are also charted in windows of this many
    /// wafers and a lot trend is printed.
    #[serde(default)]
    pub spc_window: Option<usize>,
}

pub fn load_config(path: &Path) -> Result<RuntimeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: RuntimeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    if config.inputs.is_empty() {
        return Err(format!("Config {} lists no inputs", path.display()));
    }
    Ok(config)
}
