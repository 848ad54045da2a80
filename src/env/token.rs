// src/env/token.rs

//! Local run identifier.
//!
//! Local runs receive an `AIRPLANE_TOKEN` shaped like a JWT so SDKs that
//! expect one keep working. It is unsigned (`alg: none`) and carries nothing
//! but the run id. It must never be treated as a credential: its only use is
//! to let a child run name its parent when it calls back into the local API.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::errors::{AirdevError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LocalRunClaims {
    #[serde(rename = "runID", default)]
    pub run_id: String,
}

const HEADER: &str = r#"{"alg":"none","typ":"JWT"}"#;

pub fn generate_local_run_identifier(run_id: &str) -> Result<String> {
    let claims = serde_json::to_vec(&LocalRunClaims {
        run_id: run_id.to_string(),
    })?;
    Ok(format!(
        "{}.{}.",
        URL_SAFE_NO_PAD.encode(HEADER),
        URL_SAFE_NO_PAD.encode(claims)
    ))
}

/// Extract the claims of a local run identifier. Nothing is verified.
pub fn parse_local_run_identifier(token: &str) -> Result<LocalRunClaims> {
    let invalid = |reason: String| {
        AirdevError::ResolutionError(format!("parsing local run identifier: {reason}"))
    };

    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload)) = (parts.next(), parts.next()) else {
        return Err(invalid("expected header and payload segments".to_string()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| invalid(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| invalid(e.to_string()))
}
