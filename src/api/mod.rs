// src/api/mod.rs

//! Remote platform API.
//!
//! The executor only needs a handful of calls from the platform: template
//! evaluation, config lookup and listing, and environment lookup. They sit behind
//! [`RemoteApi`] so the server can run against the real platform
//! ([`HttpApiClient`]), fully offline ([`OfflineApiClient`]), or a test
//! double.

pub mod http;
pub mod offline;
pub mod types;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::Result;

pub use http::{ApiAuth, HttpApiClient};
pub use offline::OfflineApiClient;
pub use types::{
    AuthInfo, Config, Env, EvaluateTemplateRequest, EvaluateTemplateResponse, GetConfigRequest,
    GetConfigResponse, ListConfigsRequest, ListConfigsResponse, TeamInfo, UserInfo,
};

#[async_trait]
pub trait RemoteApi: Send + Sync + Debug {
    /// Expand `{{ }}` templates inside `req.value`.
    async fn evaluate_template(
        &self,
        req: EvaluateTemplateRequest,
    ) -> Result<EvaluateTemplateResponse>;

    async fn get_config(&self, req: GetConfigRequest) -> Result<GetConfigResponse>;

    async fn list_configs(&self, req: ListConfigsRequest) -> Result<ListConfigsResponse>;

    async fn get_env(&self, slug: &str) -> Result<Env>;
}
