use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use airdev::api::types::STUDIO_ENV_SLUG;
use airdev::api::{
    Config, Env, EvaluateTemplateRequest, EvaluateTemplateResponse, GetConfigRequest,
    GetConfigResponse, ListConfigsRequest, ListConfigsResponse, RemoteApi,
};
use airdev::errors::{AirdevError, Result};

/// In-memory [`RemoteApi`].
///
/// - templates: string values registered with [`with_template`] are replaced;
///   any other string containing `{{` fails in strict mode and is left as-is
///   otherwise
/// - configs are served by name, and listed for any env
/// - every request is recorded
///
/// [`with_template`]: MockApiClient::with_template
#[derive(Debug, Default)]
pub struct MockApiClient {
    templates: BTreeMap<String, Value>,
    configs: BTreeMap<String, Config>,
    envs: BTreeMap<String, Env>,
    evaluate_calls: Mutex<Vec<EvaluateTemplateRequest>>,
    config_calls: Mutex<Vec<GetConfigRequest>>,
    list_calls: Mutex<Vec<ListConfigsRequest>>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: &str, value: impl Into<Value>) -> Self {
        self.templates.insert(template.to_string(), value.into());
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.configs.insert(config.name.clone(), config);
        self
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.envs.insert(env.slug.clone(), env);
        self
    }

    pub fn evaluate_calls(&self) -> Vec<EvaluateTemplateRequest> {
        self.evaluate_calls.lock().unwrap().clone()
    }

    pub fn config_calls(&self) -> Vec<GetConfigRequest> {
        self.config_calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> Vec<ListConfigsRequest> {
        self.list_calls.lock().unwrap().clone()
    }

    fn evaluate(&self, value: Value, strict: bool) -> Result<Value> {
        match value {
            Value::String(s) => match self.templates.get(&s) {
                Some(replacement) => Ok(replacement.clone()),
                None if strict && s.contains("{{") => Err(AirdevError::ResolutionError(
                    format!("unable to evaluate {s:?}"),
                )),
                None => Ok(Value::String(s)),
            },
            Value::Array(items) => items
                .into_iter()
                .map(|v| self.evaluate(v, strict))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Ok((k, self.evaluate(v, strict)?)))
                .collect::<Result<serde_json::Map<_, _>>>()
                .map(Value::Object),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl RemoteApi for MockApiClient {
    async fn evaluate_template(
        &self,
        req: EvaluateTemplateRequest,
    ) -> Result<EvaluateTemplateResponse> {
        self.evaluate_calls.lock().unwrap().push(req.clone());
        let value = self.evaluate(req.value, !req.disable_strict_mode)?;
        Ok(EvaluateTemplateResponse { value })
    }

    async fn get_config(&self, req: GetConfigRequest) -> Result<GetConfigResponse> {
        self.config_calls.lock().unwrap().push(req.clone());
        self.configs
            .get(&req.name)
            .cloned()
            .map(|config| GetConfigResponse { config })
            .ok_or_else(|| AirdevError::NotFound(format!("config {}", req.name)))
    }

    async fn list_configs(&self, req: ListConfigsRequest) -> Result<ListConfigsResponse> {
        self.list_calls.lock().unwrap().push(req.clone());
        let configs = self
            .configs
            .values()
            .filter(|c| req.names.is_empty() || req.names.contains(&c.name))
            .cloned()
            .collect();
        Ok(ListConfigsResponse { configs })
    }

    async fn get_env(&self, slug: &str) -> Result<Env> {
        if slug == STUDIO_ENV_SLUG {
            return Ok(Env::studio());
        }
        self.envs
            .get(slug)
            .cloned()
            .ok_or_else(|| AirdevError::NotFound(format!("env {slug}")))
    }
}
