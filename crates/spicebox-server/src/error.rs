//! Error types for spicebox-server.

use std::path::PathBuf;

use thiserror::Error;

use crate::plot::PlotError;

/// Failure of a tool invocation.
///
/// Every variant reaches the client the same way (a failed tool call carrying
/// the message); the variants only decide the wording.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required argument '{0}': {0} is required")]
    MissingArgument(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{0}")]
    Validation(String),

    #[error("Simulation failed: {0}")]
    Engine(String),

    #[error(transparent)]
    Core(#[from] spicebox_core::Error),

    #[error(transparent)]
    Signal(#[from] spicebox_signal::Error),

    #[error("Plot rendering failed: {0}")]
    Plot(#[from] PlotError),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        ToolError::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ToolError>;

/// Failure loading a [`ServerConfig`](crate::ServerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
