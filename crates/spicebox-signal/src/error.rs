//! Error types for spicebox-signal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("signal '{0}' has no imaginary data; run an AC analysis first")]
    NotComplex(String),

    #[error("{operation} needs {expected} results, but the cached result is {actual}")]
    WrongAnalysis {
        operation: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("need at least {needed} samples, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("x values must be strictly increasing (index {0})")]
    NotIncreasing(usize),

    #[error("x and y lengths differ: {x} vs {y}")]
    LengthMismatch { x: usize, y: usize },

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("unknown metric: {0}")]
    UnknownMetric(String),

    #[error("{0}")]
    NotMeasurable(String),

    #[error(transparent)]
    Core(#[from] spicebox_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for spicebox_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            other => spicebox_core::Error::Validation(other.to_string()),
        }
    }
}
