// src/api/types.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Resource, Values};

/// Slug, id and name of the environment used for purely local runs.
pub const STUDIO_ENV_SLUG: &str = "studio";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Env {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub default: bool,
}

impl Env {
    /// The synthetic environment local runs execute in.
    pub fn studio() -> Self {
        Self {
            id: STUDIO_ENV_SLUG.to_string(),
            slug: STUDIO_ENV_SLUG.to_string(),
            name: STUDIO_ENV_SLUG.to_string(),
            default: true,
        }
    }
}

/// A named config variable, local or remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(rename = "configID", default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub is_secret: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateTemplateRequest {
    pub value: Value,
    #[serde(rename = "runID")]
    pub run_id: String,
    pub env: Env,
    pub resources: BTreeMap<String, Resource>,
    pub configs: BTreeMap<String, String>,
    pub param_values: Values,
    #[serde(rename = "taskID", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_slug: Option<String>,
    #[serde(rename = "parentRunID", skip_serializing_if = "Option::is_none")]
    pub parent_run_id: Option<String>,
    /// Leave unresolvable templates in place instead of failing.
    #[serde(default)]
    pub disable_strict_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EvaluateTemplateResponse {
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GetConfigRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub show_secret: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GetConfigResponse {
    pub config: Config,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListConfigsRequest {
    /// Restrict the listing to these names; empty lists every config.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    pub show_secrets: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListConfigsResponse {
    pub configs: Vec<Config>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TeamInfo {
    pub id: String,
}

/// Identity of the developer running the local server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AuthInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamInfo>,
}

impl AuthInfo {
    pub fn user(&self) -> UserInfo {
        self.user.clone().unwrap_or_default()
    }

    pub fn team_id(&self) -> String {
        self.team.as_ref().map(|t| t.id.clone()).unwrap_or_default()
    }
}
