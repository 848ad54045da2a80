// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::outputs::OutputError;

#[derive(Error, Debug)]
pub enum AirdevError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("run with id {0:?} not found")]
    RunNotFound(String),

    /// A task, view or builtin that does not exist.
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    OutputError(#[from] OutputError),

    /// A config variable, template, or secret could not be resolved before
    /// the process was started.
    #[error("{0}")]
    ResolutionError(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Non-2xx reply from the remote platform.
    #[error("{message} (status {status})")]
    ApiError { status: u16, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AirdevError>;
