//! Runner configuration

use gridsense_classifiers::ClassifierConfig;
use gridsense_core::stream::DEFAULT_MAX_LINE_LEN;
use gridsense_telemetry::ReportFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Input byte stream: a file or device path, or `-` for stdin
    #[serde(default = "default_input")]
    pub input: String,

    /// Report output format
    #[serde(default)]
    pub format: ReportFormat,

    /// Lines longer than this are discarded unparsed
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,

    /// Model, labels, threshold, and signal settings
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl RunnerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(input) = &cli.input {
            config.input = input.clone();
        }

        if let Some(model) = &cli.model {
            config.classifier.model.path = model.clone();
        }

        if let Some(format) = cli.format {
            config.format = format;
        }

        if let Some(threshold) = cli.threshold {
            config.classifier.threshold = threshold;
        }

        config.classifier.validate()?;
        if config.max_line_len == 0 {
            anyhow::bail!("max_line_len must be non-zero");
        }

        Ok(config)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            format: ReportFormat::default(),
            max_line_len: default_max_line_len(),
            classifier: ClassifierConfig::default(),
        }
    }
}

fn default_input() -> String {
    "-".to_string()
}

fn default_max_line_len() -> usize {
    DEFAULT_MAX_LINE_LEN
}
