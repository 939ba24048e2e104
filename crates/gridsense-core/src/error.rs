//! Error types for gridsense

/// Result type alias using gridsense's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for gridsense operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An empty token between delimiters (or before the first one)
    #[error("malformed token: empty value at index {index}")]
    MalformedToken {
        /// Zero-based index of the token that was empty
        index: usize,
    },

    /// The stream ended before enough values were read
    #[error("insufficient values: expected {expected}, found {found}")]
    InsufficientValues { expected: usize, found: usize },

    /// The inference engine reported a failure while running
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// The inference engine could not be initialized
    #[error("inference engine initialization failed: {0}")]
    EngineInit(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new inference failure
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::InferenceFailed(msg.into())
    }

    /// Create a new engine initialization error
    pub fn engine_init(msg: impl Into<String>) -> Self {
        Self::EngineInit(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the pipeline can carry on with the next input line.
    ///
    /// Parse and inference failures only affect the line that caused them.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken { .. } | Self::InsufficientValues { .. } | Self::InferenceFailed(_)
        )
    }

    /// Short stable name for the error kind, used in reports and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedToken { .. } => "malformed_token",
            Self::InsufficientValues { .. } => "insufficient_values",
            Self::InferenceFailed(_) => "inference_failed",
            Self::EngineInit(_) => "engine_init",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
        }
    }
}
