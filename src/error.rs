//! Error types for pacserve.

use std::io;

use thiserror::Error;

use crate::pac::RenderError;
use crate::rules::{DecodeError, ParseError, SourceError};

/// Main error type for pacserve operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to generate PAC: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("metrics error: {0}")]
    Metrics(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
}

/// Validation errors for configuration values.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("proxy cannot be empty")]
    EmptyProxy,

    #[error("proxy must not contain quotes, backslashes or line breaks: {proxy:?}")]
    InvalidProxy { proxy: String },

    #[error("gfwlist path cannot be empty")]
    EmptyGfwlistPath,

    #[error("custom list path cannot be empty")]
    EmptyCustomPath,
}

/// Errors from turning rule sources into a PAC script.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{name}: {source}")]
    Source {
        name: String,
        #[source]
        source: SourceError,
    },

    #[error("decode {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },

    #[error("no domains parsed from lists")]
    NoDomains,

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl From<ParseError> for PipelineError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::NoDomains => Self::NoDomains,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
