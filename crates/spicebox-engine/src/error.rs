//! Error types for spicebox-engine.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("singular matrix in {0} analysis (check for floating nodes or voltage-source loops)")]
    SingularMatrix(&'static str),

    #[error("component '{component}' ({kind}) is not supported by the linear engine")]
    Unsupported { component: String, kind: String },

    #[error("source '{0}' not found (expected an independent voltage or current source)")]
    SourceNotFound(String),

    #[error("invalid analysis: {0}")]
    InvalidAnalysis(String),

    #[error("circuit has no components")]
    EmptyCircuit,

    #[error(transparent)]
    Core(#[from] spicebox_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for spicebox_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Core(inner) => inner,
            Error::SingularMatrix(analysis) => spicebox_core::Error::SingularMatrix(format!(
                "{} analysis (check for floating nodes or voltage-source loops)",
                analysis
            )),
            other => spicebox_core::Error::Engine(other.to_string()),
        }
    }
}
