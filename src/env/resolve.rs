// src/env/resolve.rs

//! Layered environment resolution.
//!
//! For a task run the layers are, lowest precedence first:
//!
//! 1. variables declared by the task,
//! 2. dotenv files between the runtime root and the entrypoint,
//! 3. overrides from the dev config,
//! 4. config references replaced by config values,
//! 5. `{{ }}` templates expanded by the remote API,
//!
//! all on top of a filtered copy of the server's environment and followed by
//! the built-in variables. Builtin runs have no runtime and skip 1-5.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::api::{AuthInfo, EvaluateTemplateRequest, GetConfigRequest, RemoteApi};
use crate::config::ConfigWithEnv;
use crate::config::loader::DEV_CONFIG_FILE_NAME;
use crate::errors::{AirdevError, Result};
use crate::exec::LocalRunConfig;
use crate::exec::expressions::{StrictMode, interpolate};
use crate::types::EnvVarValue;

use super::builtin_vars::{builtin_task_env_vars, builtin_view_env_vars, filtered_system_env_vars};
use super::dotenv::read_dotenv_files;

/// Inputs for [`env_vars_for_view`].
#[derive(Debug, Clone, Default)]
pub struct ViewEnvConfig {
    pub view_env_vars: BTreeMap<String, EnvVarValue>,
    pub dev_config_env_vars: BTreeMap<String, String>,
    pub config_vars: BTreeMap<String, ConfigWithEnv>,
    pub fallback_env_slug: Option<String>,
    pub auth_info: AuthInfo,
    pub name: String,
    pub slug: String,
    pub view_url: String,
    pub api_headers: BTreeMap<String, String>,
}

/// Layers 2 and 3 on top of the declared variables.
pub fn apply_env_var_file_overrides(
    declared: &BTreeMap<String, EnvVarValue>,
    dev_config_env_vars: &BTreeMap<String, String>,
    dotenv: &BTreeMap<String, String>,
) -> BTreeMap<String, EnvVarValue> {
    let mut env_vars = declared.clone();
    for (key, value) in dotenv.iter().chain(dev_config_env_vars) {
        env_vars.insert(key.clone(), EnvVarValue::literal(value.clone()));
    }
    env_vars
}

/// Replace config references with config values.
///
/// Entries with neither a value nor a config reference are dropped.
pub async fn materialize_env_vars(
    remote: &dyn RemoteApi,
    env_vars: &BTreeMap<String, EnvVarValue>,
    config_vars: &BTreeMap<String, ConfigWithEnv>,
    fallback_env_slug: Option<&str>,
) -> Result<BTreeMap<String, String>> {
    let mut materialized = BTreeMap::new();
    for (key, env_var) in env_vars {
        if let Some(value) = &env_var.value {
            materialized.insert(key.clone(), value.clone());
            continue;
        }
        let Some(name) = &env_var.config else {
            continue;
        };

        let Some(config) = config_vars.get(name) else {
            let mut message = format!("Config var {name} not defined in {DEV_CONFIG_FILE_NAME}");
            if let Some(env) = fallback_env_slug.filter(|s| !s.is_empty()) {
                message.push_str(&format!(" or remotely in env {env}"));
            }
            message.push_str(&format!(" (referenced by env var {key})"));
            return Err(AirdevError::ResolutionError(message));
        };

        materialized.insert(key.clone(), config_value(remote, config).await?);
    }
    Ok(materialized)
}

/// The value of a config variable. Remote secrets are fetched decrypted.
pub async fn config_value(remote: &dyn RemoteApi, config: &ConfigWithEnv) -> Result<String> {
    if !(config.remote && config.config.is_secret) {
        return Ok(config.config.value.clone());
    }

    let name = &config.config.name;
    debug!(config = %name, env = %config.env.slug, "fetching secret config");
    let req = GetConfigRequest {
        name: name.clone(),
        tag: Some(config.config.tag.clone()).filter(|t| !t.is_empty()),
        show_secret: true,
        env_slug: Some(config.env.slug.clone()),
    };
    let res = remote
        .get_config(req)
        .await
        .map_err(|e| AirdevError::ResolutionError(format!("getting config {name}: {e}")))?;
    Ok(res.config.value)
}

/// The full environment for a task process, as ordered `(key, value)`
/// pairs; later pairs win.
///
/// `runtime_root` is `None` for builtins.
pub async fn task_env_vars(
    config: &LocalRunConfig,
    runtime_root: Option<&Path>,
    base: &EvaluateTemplateRequest,
) -> Result<Vec<(String, String)>> {
    let mut env = filtered_system_env_vars();

    if let Some(root) = runtime_root {
        let dotenv = match &config.entrypoint {
            Some(entrypoint) => read_dotenv_files(config.fs.as_ref(), entrypoint, root)?,
            None => BTreeMap::new(),
        };
        let declared =
            apply_env_var_file_overrides(&config.task_env_vars, &config.dev_config_env_vars, &dotenv);
        let materialized = materialize_env_vars(
            config.remote.as_ref(),
            &declared,
            &config.config_vars,
            config.fallback_env_slug.as_deref(),
        )
        .await?;

        if !materialized.is_empty() {
            let value = serde_json::to_value(&materialized)?;
            let interpolated =
                interpolate(config.remote.as_ref(), base, StrictMode::On, value).await?;
            env.extend(env_pairs(interpolated)?);
        }
    }

    env.extend(builtin_task_env_vars(config)?);
    Ok(env)
}

/// Environment for a view: declared variables with dev config overrides and
/// materialized configs, plus view built-ins. No dotenv files, no templates.
pub async fn env_vars_for_view(
    remote: &dyn RemoteApi,
    config: &ViewEnvConfig,
) -> Result<BTreeMap<String, String>> {
    let declared = apply_env_var_file_overrides(
        &config.view_env_vars,
        &config.dev_config_env_vars,
        &BTreeMap::new(),
    );
    let mut env = materialize_env_vars(
        remote,
        &declared,
        &config.config_vars,
        config.fallback_env_slug.as_deref(),
    )
    .await?;

    env.extend(builtin_view_env_vars(config)?);
    Ok(env)
}

fn env_pairs(value: Value) -> Result<Vec<(String, String)>> {
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(AirdevError::ResolutionError(format!(
                "expected map of env vars (key=value pairs) after interpolation, got {other}"
            )));
        }
    };

    Ok(map
        .into_iter()
        .map(|(k, v)| match v {
            Value::String(s) => (k, s),
            other => (k, other.to_string()),
        })
        .collect())
}
