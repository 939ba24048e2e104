//! Configuration for the classifier, its model, and the signal action

use gridsense_core::{Error, LabelSet, Result, DEFAULT_THRESHOLD, NUM_CLASSES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the classification stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Model to load into the inference engine
    #[serde(default)]
    pub model: ModelSpec,

    /// Class names, in model output order
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,

    /// Minimum top-class probability for a positive decision
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Signal action settings
    #[serde(default)]
    pub signal: SignalConfig,
}

impl ClassifierConfig {
    /// Check counts and ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(Error::config(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.labels.len() != NUM_CLASSES {
            return Err(Error::config(format!(
                "expected {} labels, got {}",
                NUM_CLASSES,
                self.labels.len()
            )));
        }
        if self.signal.repetitions.len() != self.labels.len() {
            return Err(Error::config(format!(
                "signal table has {} entries for {} labels",
                self.signal.repetitions.len(),
                self.labels.len()
            )));
        }
        if self.signal.interval_ms == 0 {
            return Err(Error::config("signal interval must be non-zero"));
        }
        Ok(())
    }

    /// Build the label set from the configured names
    pub fn label_set(&self) -> Result<LabelSet> {
        LabelSet::new(self.labels.iter().cloned())
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: ModelSpec::default(),
            labels: default_labels(),
            threshold: default_threshold(),
            signal: SignalConfig::default(),
        }
    }
}

/// Model weights and topology
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// SafeTensors weights file
    #[serde(default = "default_model_path")]
    pub path: PathBuf,

    /// Hidden layer widths between the input and the class outputs
    #[serde(default = "default_hidden")]
    pub hidden: Vec<usize>,

    /// Device to run inference on
    #[serde(default)]
    pub device: DeviceSpec,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            hidden: default_hidden(),
            device: DeviceSpec::default(),
        }
    }
}

/// Device specification (for config files)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda {
        #[serde(default)]
        index: usize,
    },
    Metal {
        #[serde(default)]
        index: usize,
    },
}

/// Signal action configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Pulse repetitions per class index
    #[serde(default = "default_repetitions")]
    pub repetitions: Vec<u32>,

    /// Time the indicator stays on, then off, per repetition
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl SignalConfig {
    /// Pulse half-period as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            repetitions: default_repetitions(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// Load and validate a classifier configuration from a YAML file
pub fn load_config(path: impl AsRef<Path>) -> Result<ClassifierConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let config: ClassifierConfig = serde_yaml::from_str(&content)
        .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))?;
    config.validate()?;
    Ok(config)
}

fn default_labels() -> Vec<String> {
    LabelSet::default()
        .iter()
        .map(|(_, name)| name.to_string())
        .collect()
}

fn default_threshold() -> f32 {
    DEFAULT_THRESHOLD
}

fn default_model_path() -> PathBuf {
    PathBuf::from("./models/grid_mlp.safetensors")
}

fn default_hidden() -> Vec<usize> {
    vec![32, 16]
}

fn default_repetitions() -> Vec<u32> {
    vec![1, 2, 3]
}

fn default_interval_ms() -> u64 {
    500
}
