// src/exec/expressions.rs

//! Template interpolation through the remote API.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::api::{EvaluateTemplateRequest, RemoteApi};
use crate::errors::{AirdevError, Result};
use crate::types::{Resource, Values};

use super::config::LocalRunConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrictMode {
    /// Unresolvable templates are errors.
    On,
    /// Unresolvable templates are left as written.
    Off,
}

/// The request every interpolation of a run starts from.
pub fn base_evaluate_template_request(config: &LocalRunConfig) -> EvaluateTemplateRequest {
    EvaluateTemplateRequest {
        value: Value::Null,
        run_id: config.id.clone(),
        env: config.env.clone(),
        resources: config.alias_to_resource.clone(),
        configs: config.config_values(),
        param_values: config.param_values.clone(),
        task_id: Some(config.slug.clone()),
        task_slug: Some(config.slug.clone()),
        parent_run_id: config.parent_run_id.clone(),
        disable_strict_mode: false,
    }
}

pub async fn interpolate(
    remote: &dyn RemoteApi,
    base: &EvaluateTemplateRequest,
    mode: StrictMode,
    value: Value,
) -> Result<Value> {
    let mut req = base.clone();
    req.value = value;
    req.disable_strict_mode = mode == StrictMode::Off;

    let res = remote
        .evaluate_template(req)
        .await
        .map_err(|e| AirdevError::ResolutionError(format!("evaluating templates: {e}")))?;
    Ok(res.value)
}

/// Interpolate an object, e.g. kind options or a builtin request.
pub async fn interpolate_object(
    remote: &dyn RemoteApi,
    base: &EvaluateTemplateRequest,
    mode: StrictMode,
    object: &Values,
) -> Result<Values> {
    if object.is_empty() {
        return Ok(object.clone());
    }
    match interpolate(remote, base, mode, Value::Object(object.clone())).await? {
        Value::Object(map) => Ok(map),
        other => Err(AirdevError::ResolutionError(format!(
            "expected an object after interpolation, got {other}"
        ))),
    }
}

/// Interpolate resource fields in a single call. Templates that cannot be
/// resolved are left in place. Ids, slugs and kinds are never rewritten.
pub async fn interpolate_resources(
    remote: &dyn RemoteApi,
    base: &EvaluateTemplateRequest,
    resources: &BTreeMap<String, Resource>,
) -> Result<BTreeMap<String, Resource>> {
    if resources.is_empty() {
        return Ok(BTreeMap::new());
    }

    let value = serde_json::to_value(resources)?;
    let value = interpolate(remote, base, StrictMode::Off, value).await?;
    let mut interpolated: BTreeMap<String, Resource> = serde_json::from_value(value)?;

    for (alias, resource) in interpolated.iter_mut() {
        if let Some(original) = resources.get(alias) {
            resource.id = original.id.clone();
            resource.slug = original.slug.clone();
            resource.kind = original.kind.clone();
        }
    }
    Ok(interpolated)
}
