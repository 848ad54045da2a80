// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::api::{AuthInfo, Config, Env};
use crate::errors::{AirdevError, Result};
use crate::types::Resource;

/// The dev config file as read from TOML.
///
/// ```toml
/// [env_vars]
/// API_MODE = "sandbox"
///
/// [config_vars]
/// db_url = "postgres://localhost/dev"
///
/// [resources.my_db]
/// kind = "postgres"
/// host = "localhost"
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDevConfig {
    /// Overrides applied on top of task-declared env vars.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env_vars: BTreeMap<String, String>,

    /// Local config variables by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config_vars: BTreeMap<String, String>,

    /// Resources by slug.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources: BTreeMap<String, RawResource>,
}

/// `[resources.<slug>]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawResource {
    #[serde(default)]
    pub kind: String,

    /// Generated from the slug when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Kind-specific fields, kept as-is.
    #[serde(flatten)]
    pub fields: BTreeMap<String, toml::Value>,
}

/// A config variable together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWithEnv {
    pub config: Config,
    /// True when the value lives on the remote platform.
    pub remote: bool,
    pub env: Env,
}

impl ConfigWithEnv {
    pub fn local(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            config: Config {
                id: dev_config_id(&name),
                name,
                tag: String::new(),
                value: value.into(),
                is_secret: false,
            },
            remote: false,
            env: Env::studio(),
        }
    }

    pub fn remote(config: Config, env: Env) -> Self {
        Self {
            config,
            remote: true,
            env,
        }
    }
}

/// A resource together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceWithEnv {
    pub resource: Resource,
    pub remote: bool,
    pub env: Env,
}

/// Validated dev config. Built from [`RawDevConfig`] via `TryFrom`.
#[derive(Debug, Clone, Default)]
pub struct DevConfig {
    /// Where the config was loaded from and where [`save`](Self::save)
    /// writes to.
    pub path: Option<PathBuf>,
    pub env_vars: BTreeMap<String, String>,
    pub config_vars: BTreeMap<String, ConfigWithEnv>,
    /// Resources by slug.
    pub resources: BTreeMap<String, ResourceWithEnv>,
}

pub fn dev_config_id(name: &str) -> String {
    format!("cfg_dev_{name}")
}

pub fn dev_resource_id(slug: &str) -> String {
    format!("res_dev_{slug}")
}

impl DevConfig {
    pub(crate) fn new_unchecked(raw: RawDevConfig) -> Result<Self> {
        let config_vars = raw
            .config_vars
            .into_iter()
            .map(|(name, value)| (name.clone(), ConfigWithEnv::local(name, value)))
            .collect();

        let mut resources = BTreeMap::new();
        for (slug, raw_resource) in raw.resources {
            let mut fields = serde_json::Map::new();
            for (key, value) in raw_resource.fields {
                fields.insert(key, serde_json::to_value(value)?);
            }
            let resource = Resource {
                id: raw_resource.id.unwrap_or_else(|| dev_resource_id(&slug)),
                slug: slug.clone(),
                kind: raw_resource.kind,
                fields,
            };
            resources.insert(
                slug,
                ResourceWithEnv {
                    resource,
                    remote: false,
                    env: Env::studio(),
                },
            );
        }

        Ok(Self {
            path: None,
            env_vars: raw.env_vars,
            config_vars,
            resources,
        })
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn set_env_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env_vars.insert(key.into(), value.into());
    }

    pub fn remove_env_var(&mut self, key: &str) -> Result<()> {
        self.env_vars
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| AirdevError::ConfigError(format!("env var {key} not found in dev config")))
    }

    pub fn set_config_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.config_vars
            .insert(name.clone(), ConfigWithEnv::local(name, value));
    }

    pub fn remove_config_var(&mut self, name: &str) -> Result<()> {
        self.config_vars
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| {
                AirdevError::ConfigError(format!("config var {name} not found in dev config"))
            })
    }

    pub fn set_resource(&mut self, resource: Resource) {
        self.resources.insert(
            resource.slug.clone(),
            ResourceWithEnv {
                resource,
                remote: false,
                env: Env::studio(),
            },
        );
    }

    pub fn remove_resource(&mut self, slug: &str) -> Result<()> {
        self.resources
            .remove(slug)
            .map(|_| ())
            .ok_or_else(|| {
                AirdevError::ConfigError(format!("resource {slug} not found in dev config"))
            })
    }

    pub fn resource_by_id(&self, id: &str) -> Option<&ResourceWithEnv> {
        self.resources.values().find(|r| r.resource.id == id)
    }

    /// Add configs fetched from the remote platform. Local configs with the
    /// same name take precedence.
    pub fn merge_remote_configs(&mut self, configs: impl IntoIterator<Item = Config>, env: &Env) {
        for config in configs {
            self.config_vars
                .entry(config.name.clone())
                .or_insert_with(|| ConfigWithEnv::remote(config, env.clone()));
        }
    }

    /// The locally-defined parts of this config, in file form.
    pub fn to_raw(&self) -> RawDevConfig {
        let config_vars = self
            .config_vars
            .iter()
            .filter(|(_, c)| !c.remote)
            .map(|(name, c)| (name.clone(), c.config.value.clone()))
            .collect();

        let resources = self
            .resources
            .iter()
            .filter(|(_, r)| !r.remote)
            .map(|(slug, r)| {
                let fields = r
                    .resource
                    .fields
                    .iter()
                    .filter_map(|(k, v)| json_to_toml(v).map(|v| (k.clone(), v)))
                    .collect();
                let id = (r.resource.id != dev_resource_id(slug)).then(|| r.resource.id.clone());
                (
                    slug.clone(),
                    RawResource {
                        kind: r.resource.kind.clone(),
                        id,
                        fields,
                    },
                )
            })
            .collect();

        RawDevConfig {
            env_vars: self.env_vars.clone(),
            config_vars,
            resources,
        }
    }
}

/// TOML has no null; nulls (and nulls nested in arrays/tables) are dropped.
fn json_to_toml(value: &serde_json::Value) -> Option<toml::Value> {
    use serde_json::Value as J;
    Some(match value {
        J::Null => return None,
        J::Bool(b) => toml::Value::Boolean(*b),
        J::Number(n) => match n.as_i64() {
            Some(i) => toml::Value::Integer(i),
            None => toml::Value::Float(n.as_f64()?),
        },
        J::String(s) => toml::Value::String(s.clone()),
        J::Array(items) => toml::Value::Array(items.iter().filter_map(json_to_toml).collect()),
        J::Object(map) => toml::Value::Table(
            map.iter()
                .filter_map(|(k, v)| json_to_toml(v).map(|v| (k.clone(), v)))
                .collect(),
        ),
    })
}

/// Settings of the local server that are not part of the dev config file.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// URL task processes use to reach the local API (`AIRPLANE_API_HOST`).
    pub api_host: String,
    /// Base URL of the studio UI, used for task/run/view links.
    pub studio_url: String,
    /// Remote env to fall back to for configs not defined locally.
    pub fallback_env_slug: Option<String>,
    pub tunnel_token: Option<String>,
    pub auth_info: AuthInfo,
    /// Binary that executes builtin tasks.
    pub builtins_path: Option<PathBuf>,
    /// Output command line limit in bytes; `0` disables it.
    pub output_line_max_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            studio_url: default_api_host(),
            fallback_env_slug: None,
            tunnel_token: None,
            auth_info: AuthInfo::default(),
            builtins_path: None,
            output_line_max_bytes: 0,
        }
    }
}

fn default_api_host() -> String {
    "http://127.0.0.1:4000".to_string()
}
