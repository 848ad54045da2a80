// src/api/http.rs

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::RemoteApi;
use super::types::{
    Env, EvaluateTemplateRequest, EvaluateTemplateResponse, GetConfigRequest, GetConfigResponse,
    ListConfigsRequest, ListConfigsResponse,
};
use crate::errors::{AirdevError, Result};

const API_PREFIX: &str = "/v0";

/// How requests to the platform are authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiAuth {
    /// A user session token, sent as `X-Airplane-Token`.
    Token(String),
    /// An API key scoped to a team.
    ApiKey { key: String, team_id: String },
}

/// [`RemoteApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    host: String,
    auth: ApiAuth,
    tunnel_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpApiClient {
    /// `host` may be given with or without a scheme; `https` is assumed.
    pub fn new(host: impl Into<String>, auth: ApiAuth) -> Self {
        let host = host.into();
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host
        } else {
            format!("https://{host}")
        };

        Self {
            client: Client::new(),
            host: host.trim_end_matches('/').to_string(),
            auth,
            tunnel_token: None,
        }
    }

    pub fn with_tunnel_token(mut self, token: Option<String>) -> Self {
        self.tunnel_token = token;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}{}", self.host, API_PREFIX, route)
    }

    fn authorize(&self, mut request: RequestBuilder) -> RequestBuilder {
        request = match &self.auth {
            ApiAuth::Token(token) => request.header("X-Airplane-Token", token),
            ApiAuth::ApiKey { key, team_id } => request
                .header("X-Airplane-API-Key", key)
                .header("X-Team-ID", team_id),
        };
        if let Some(token) = &self.tunnel_token {
            request = request.header("X-Airplane-Dev-Token", token);
        }
        request
    }

    async fn get<T: DeserializeOwned>(&self, route: &str, query: &[(&str, &str)]) -> Result<T> {
        debug!(route, "GET remote api");
        let request = self.authorize(self.client.get(self.url(route)).query(query));
        decode(request.send().await?).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<T> {
        debug!(route, "POST remote api");
        let request = self.authorize(self.client.post(self.url(route)).json(body));
        decode(request.send().await?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or(body);
        return Err(AirdevError::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

#[async_trait]
impl RemoteApi for HttpApiClient {
    async fn evaluate_template(
        &self,
        req: EvaluateTemplateRequest,
    ) -> Result<EvaluateTemplateResponse> {
        self.post("/templates/evaluate", &req).await
    }

    async fn get_config(&self, req: GetConfigRequest) -> Result<GetConfigResponse> {
        self.post("/configs/get", &req).await
    }

    async fn list_configs(&self, req: ListConfigsRequest) -> Result<ListConfigsResponse> {
        self.post("/configs/list", &req).await
    }

    async fn get_env(&self, slug: &str) -> Result<Env> {
        self.get("/envs/get", &[("slug", slug)]).await
    }
}

