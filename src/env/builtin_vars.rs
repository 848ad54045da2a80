// src/env/builtin_vars.rs

//! Environment variables the dev server injects on its own.

use std::collections::BTreeMap;

use crate::api::types::STUDIO_ENV_SLUG;
use crate::config::DevConfig;
use crate::errors::Result;
use crate::exec::LocalRunConfig;

use super::resolve::ViewEnvConfig;
use super::token::generate_local_run_identifier;

/// Only these are inherited from the server's own environment.
pub const ALLOWED_SYSTEM_ENV_VARS: [&str; 2] = ["HOME", "PATH"];

pub fn filtered_system_env_vars() -> Vec<(String, String)> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .filter(|(k, _)| ALLOWED_SYSTEM_ENV_VARS.contains(&k.as_str()))
        .collect()
}

/// Variables shared by tasks, views and discovery. Local runs all execute in
/// the single studio environment.
pub fn common_env_vars() -> BTreeMap<String, String> {
    [
        ("AIRPLANE_ENV_ID", STUDIO_ENV_SLUG),
        ("AIRPLANE_ENV_SLUG", STUDIO_ENV_SLUG),
        ("AIRPLANE_ENV_NAME", STUDIO_ENV_SLUG),
        ("AIRPLANE_ENV_IS_DEFAULT", "true"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn studio_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Built-in variables for a task run. Applied last, so they win over
/// anything the task or the developer declared.
pub fn builtin_task_env_vars(config: &LocalRunConfig) -> Result<Vec<(String, String)>> {
    let user = config.auth_info.user();
    let task_url = studio_url(&config.studio_url, &format!("/task/{}", config.slug));
    let run_url = studio_url(&config.studio_url, &format!("/runs/{}", config.id));

    let mut env: Vec<(String, String)> = vec![
        ("AIRPLANE_API_HOST".into(), config.api_host.clone()),
        ("AIRPLANE_RESOURCES_VERSION".into(), "2".into()),
        ("AIRPLANE_RUN_ID".into(), config.id.clone()),
        (
            "AIRPLANE_PARENT_RUN_ID".into(),
            config.parent_run_id.clone().unwrap_or_default(),
        ),
        ("AIRPLANE_RUNNER_EMAIL".into(), user.email),
        ("AIRPLANE_RUNNER_ID".into(), user.id),
        ("AIRPLANE_RUNNER_NAME".into(), user.name),
        ("AIRPLANE_RUNTIME".into(), "dev".into()),
        // Locally a task's id is its slug.
        ("AIRPLANE_TASK_ID".into(), config.slug.clone()),
        ("AIRPLANE_TASK_SLUG".into(), config.slug.clone()),
        ("AIRPLANE_TASK_NAME".into(), config.name.clone()),
        ("AIRPLANE_TEAM_ID".into(), config.auth_info.team_id()),
        ("AIRPLANE_TASK_URL".into(), task_url),
        ("AIRPLANE_RUN_URL".into(), run_url),
    ];
    env.extend(common_env_vars());

    env.push((
        "AIRPLANE_TOKEN".into(),
        generate_local_run_identifier(&config.id)?,
    ));
    env.push((
        "AIRPLANE_RESOURCES".into(),
        serde_json::to_string(&config.alias_to_resource)?,
    ));
    if let Some(token) = &config.tunnel_token {
        env.push(("AIRPLANE_TUNNEL_TOKEN".into(), token.clone()));
    }

    Ok(env)
}

pub fn builtin_view_env_vars(config: &ViewEnvConfig) -> Result<BTreeMap<String, String>> {
    let user = config.auth_info.user();
    let mut env = BTreeMap::new();

    env.insert("AIRPLANE_USER_EMAIL".to_string(), user.email);
    env.insert("AIRPLANE_USER_ID".to_string(), user.id);
    env.insert("AIRPLANE_USER_NAME".to_string(), user.name);

    env.insert("AIRPLANE_VIEW_ID".to_string(), config.slug.clone());
    env.insert("AIRPLANE_VIEW_SLUG".to_string(), config.slug.clone());
    env.insert("AIRPLANE_VIEW_NAME".to_string(), config.name.clone());
    env.insert("AIRPLANE_VIEW_URL".to_string(), config.view_url.clone());

    env.insert("AIRPLANE_TEAM_ID".to_string(), config.auth_info.team_id());

    if !config.api_headers.is_empty() {
        env.insert(
            "AIRPLANE_API_HEADERS".to_string(),
            serde_json::to_string(&config.api_headers)?,
        );
    }

    env.extend(common_env_vars());
    Ok(env)
}

/// Variables visible while discovering tasks: the common set, a `build`
/// runtime marker and the developer's overrides.
pub fn discovery_env_vars(dev_config: Option<&DevConfig>) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = common_env_vars().into_iter().collect();
    env.push(("AIRPLANE_RUNTIME".to_string(), "build".to_string()));

    if let Some(dev_config) = dev_config {
        env.extend(
            dev_config
                .env_vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
    }
    env
}
