// src/handlers/views.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::HandlerResult;
use crate::env::builtin_vars::studio_url;
use crate::env::{ViewEnvConfig, env_vars_for_view};
use crate::errors::AirdevError;
use crate::state::ServerState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetViewEnvVarsRequest {
    pub view_slug: String,
    /// Headers the view should send to the API, exposed as
    /// `AIRPLANE_API_HEADERS`.
    #[serde(default)]
    pub api_headers: BTreeMap<String, String>,
}

pub async fn get_view_env_vars(
    state: &ServerState,
    req: GetViewEnvVarsRequest,
) -> HandlerResult<BTreeMap<String, String>> {
    let view = state
        .views
        .get(&req.view_slug)
        .ok_or_else(|| AirdevError::NotFound(format!("view {}", req.view_slug)))?;
    let mut dev_config = state.dev_config();
    state.merge_fallback_configs(&mut dev_config).await?;

    let config = ViewEnvConfig {
        view_env_vars: view.env_vars,
        dev_config_env_vars: dev_config.env_vars,
        config_vars: dev_config.config_vars,
        fallback_env_slug: state.settings.fallback_env_slug.clone(),
        auth_info: state.settings.auth_info.clone(),
        view_url: studio_url(&state.settings.studio_url, &format!("/view/{}", view.slug)),
        name: view.name,
        slug: view.slug,
        api_headers: req.api_headers,
    };

    Ok(env_vars_for_view(state.remote.as_ref(), &config).await?)
}
