//! Error types for spicebox-library.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("library path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("failed to walk {path}: {message}")]
    Walk { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
