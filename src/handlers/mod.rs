// src/handlers/mod.rs

//! Request handlers of the local dev server.
//!
//! They are transport-agnostic: each takes the shared [`ServerState`] and a
//! typed request, and returns a typed response or an [`ApiError`] whose
//! serialized form is `{"error": message}`.
//!
//! [`ServerState`]: crate::state::ServerState

pub mod logs;
pub mod runs;
pub mod tasks;
pub mod views;

use serde::Serialize;
use thiserror::Error;

use crate::errors::AirdevError;

pub use logs::{sse_event, stream_logs};
pub use runs::{
    CancelRunRequest, GetOutputsResponse, ListDescendantsResponse, ListRunsResponse, cancel_run,
    get_descendants, get_outputs, get_run, list_runs,
};
pub use tasks::{ExecuteTaskRequest, PrepareRunRequest, execute_task, prepare_run};
pub use views::{GetViewEnvVarsRequest, get_view_env_vars};

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message}")]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    #[serde(rename = "error")]
    pub message: String,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }
}

impl From<AirdevError> for ApiError {
    fn from(err: AirdevError) -> Self {
        let status = match &err {
            AirdevError::RunNotFound(_) | AirdevError::NotFound(_) => 404,
            AirdevError::ConfigError(_)
            | AirdevError::ResolutionError(_)
            | AirdevError::UnsupportedFileType(_) => 400,
            AirdevError::ApiError { status, .. } => *status,
            _ => 500,
        };
        Self::new(status, err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(format!("{err:#}"))
    }
}

pub type HandlerResult<T> = std::result::Result<T, ApiError>;
