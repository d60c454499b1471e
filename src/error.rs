//! Error types for reelsplice.

use crate::pipeline::state::RunState;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReelError {
    // Caller input errors
    #[error("Invalid input: {message}")]
    Input { message: String },

    // Network errors (synthesis, generation, download, relay upstream)
    #[error("Network request failed: {message}")]
    Network {
        message: String,
        status: Option<u16>,
    },

    // External process errors
    #[error("Media tool not found: {tool}")]
    ToolNotFound { tool: String },

    #[error("Media tool timed out after {timeout_ms}ms: {command}")]
    ProcessTimeout { command: String, timeout_ms: u64 },

    #[error("Media tool failed: {message}")]
    Process { message: String },

    #[error("Incompatible media for stream-copy concatenation: {message}")]
    IncompatibleMedia { message: String },

    // Configuration errors
    #[error("Missing credential: {name}")]
    MissingCredential { name: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Run-level failure tagged with the stage that failed
    #[error("Pipeline failed during {stage}: {source}")]
    StageFailed {
        stage: RunState,
        #[source]
        source: Box<ReelError>,
    },
}

/// Coarse error taxonomy surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Network,
    Process,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Input => "input",
            ErrorKind::Network => "network",
            ErrorKind::Process => "process",
            ErrorKind::Config => "config",
        };
        f.write_str(name)
    }
}

impl ReelError {
    pub fn input(message: impl Into<String>) -> Self {
        ReelError::Input {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ReelError::Network {
            message: message.into(),
            status: None,
        }
    }

    pub fn process(message: impl Into<String>) -> Self {
        ReelError::Process {
            message: message.into(),
        }
    }

    /// Wrap this error with the stage of the run it occurred in.
    ///
    /// An error that already carries a stage keeps its original one.
    pub fn at_stage(self, stage: RunState) -> Self {
        match self {
            already @ ReelError::StageFailed { .. } => already,
            other => ReelError::StageFailed {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage of the run that failed, if this is a run-level error.
    pub fn stage(&self) -> Option<RunState> {
        match self {
            ReelError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Map onto the coarse taxonomy, looking through stage wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReelError::Input { .. } | ReelError::Json(_) => ErrorKind::Input,
            ReelError::Network { .. } => ErrorKind::Network,
            ReelError::ToolNotFound { .. }
            | ReelError::ProcessTimeout { .. }
            | ReelError::Process { .. }
            | ReelError::IncompatibleMedia { .. }
            | ReelError::Io(_) => ErrorKind::Process,
            ReelError::MissingCredential { .. }
            | ReelError::ConfigInvalidValue { .. }
            | ReelError::Config(_) => ErrorKind::Config,
            ReelError::StageFailed { source, .. } => source.kind(),
        }
    }
}

impl From<reqwest::Error> for ReelError {
    fn from(e: reqwest::Error) -> Self {
        let message = if e.is_timeout() {
            format!("request timed out: {e}")
        } else if e.is_connect() {
            format!("connection failed: {e}")
        } else {
            e.to_string()
        };
        ReelError::Network {
            message,
            status: e.status().map(|s| s.as_u16()),
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ReelError>;
