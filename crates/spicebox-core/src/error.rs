//! Error types for spicebox-core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("circuit '{0}' not found")]
    CircuitNotFound(String),

    #[error("circuit '{0}' already exists")]
    CircuitExists(String),

    #[error("no active circuit: create one or pass circuit_id")]
    NoActiveCircuit,

    #[error("no analysis results for circuit '{0}': run an analysis first")]
    NoResults(String),

    #[error("signal '{signal}' not found in {analysis} results (available: {available})")]
    SignalNotFound {
        signal: String,
        analysis: String,
        available: String,
    },

    #[error("invalid component: {0}")]
    InvalidComponent(String),

    #[error("invalid analysis result: {0}")]
    InvalidResult(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unsupported analysis type: {0}")]
    UnsupportedAnalysis(String),

    #[error("singular circuit matrix: {0}")]
    SingularMatrix(String),

    #[error("engine error: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, Error>;
