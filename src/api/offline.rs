// src/api/offline.rs

use async_trait::async_trait;
use tracing::debug;

use super::RemoteApi;
use super::types::{
    Env, EvaluateTemplateRequest, EvaluateTemplateResponse, GetConfigRequest, GetConfigResponse,
    ListConfigsRequest, ListConfigsResponse,
};
use crate::errors::{AirdevError, Result};

/// [`RemoteApi`] used when no platform host is configured.
///
/// Templates come back unchanged and only the local studio environment
/// exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineApiClient;

#[async_trait]
impl RemoteApi for OfflineApiClient {
    async fn evaluate_template(
        &self,
        req: EvaluateTemplateRequest,
    ) -> Result<EvaluateTemplateResponse> {
        debug!(run_id = %req.run_id, "offline: passing template through");
        Ok(EvaluateTemplateResponse { value: req.value })
    }

    async fn get_config(&self, req: GetConfigRequest) -> Result<GetConfigResponse> {
        Err(AirdevError::ResolutionError(format!(
            "config {} is not available without a remote API host",
            req.name
        )))
    }

    async fn list_configs(&self, req: ListConfigsRequest) -> Result<ListConfigsResponse> {
        debug!(env = ?req.env_slug, "offline: no remote configs");
        Ok(ListConfigsResponse::default())
    }

    async fn get_env(&self, slug: &str) -> Result<Env> {
        if slug == super::types::STUDIO_ENV_SLUG {
            return Ok(Env::studio());
        }
        Err(AirdevError::ResolutionError(format!(
            "env {slug} is not available without a remote API host"
        )))
    }
}

