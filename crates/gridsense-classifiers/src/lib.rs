//! gridsense Classifiers
//!
//! Classification of 8×8 input matrices into a fixed set of classes.
//!
//! The model itself is an injected [`InferenceEngine`]; this crate owns
//! everything around it:
//! - The Candle-backed fixed-topology engine (feature `ml-models`)
//! - The classification pipeline and its confidence-threshold decision
//! - The class → signal pulse table and pulse driver
//! - YAML configuration for all of the above

#[cfg(feature = "ml-models")]
pub mod candle_engine;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod signal;

#[cfg(feature = "ml-models")]
pub use candle_engine::CandleEngine;
pub use config::{load_config, ClassifierConfig, DeviceSpec, ModelSpec, SignalConfig};
pub use engine::InferenceEngine;
pub use pipeline::{Classification, ClassificationPipeline, CycleOutcome};
pub use signal::{pulse, LogSignal, SignalSink, SignalTable};

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "ml-models")]
    pub use crate::candle_engine::CandleEngine;
    pub use crate::config::ClassifierConfig;
    pub use crate::engine::InferenceEngine;
    pub use crate::pipeline::{Classification, ClassificationPipeline, CycleOutcome};
    pub use crate::signal::{pulse, SignalSink, SignalTable};
}
