#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Notify;

use airdev::api::{Config, Env, RemoteApi};
use airdev::config::model::dev_resource_id;
use airdev::config::{ConfigWithEnv, DevConfig, ServerSettings};
use airdev::exec::{Executor, LocalRunConfig};
use airdev::fs::FileSystem;
use airdev::fs::mock::MockFileSystem;
use airdev::logs::LogBroker;
use airdev::state::ServerState;
use airdev::types::{EnvVarValue, Parameter, Resource, TaskConfig, TaskKind};

use crate::MockApiClient;

/// A resource with a generated dev id and no extra fields.
pub fn resource(slug: &str, kind: &str) -> Resource {
    Resource {
        id: dev_resource_id(slug),
        slug: slug.to_string(),
        kind: kind.to_string(),
        fields: Map::new(),
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(slug: &str) -> Self {
        Self {
            task: TaskConfig {
                slug: slug.to_string(),
                name: slug.to_string(),
                ..TaskConfig::default()
            },
        }
    }

    pub fn kind(mut self, kind: TaskKind) -> Self {
        self.task.kind = kind;
        self
    }

    pub fn entrypoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.task.entrypoint = Some(path.into());
        self
    }

    pub fn kind_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.task.kind_options.insert(key.to_string(), value.into());
        self
    }

    pub fn env_var(mut self, key: &str, value: EnvVarValue) -> Self {
        self.task.env_vars.insert(key.to_string(), value);
        self
    }

    pub fn parameter(mut self, slug: &str) -> Self {
        self.task.parameters.push(Parameter {
            slug: slug.to_string(),
            name: slug.to_string(),
            kind: "shorttext".to_string(),
            required: false,
            default: None,
        });
        self
    }

    /// Attach the dev config resource `slug` under `alias`.
    pub fn resource(mut self, alias: &str, slug: &str) -> Self {
        self.task
            .resources
            .insert(alias.to_string(), slug.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Builder for `DevConfig`.
#[derive(Default)]
pub struct DevConfigBuilder {
    config: DevConfig,
}

impl DevConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env_var(mut self, key: &str, value: &str) -> Self {
        self.config.set_env_var(key, value);
        self
    }

    pub fn config_var(mut self, name: &str, value: &str) -> Self {
        self.config.set_config_var(name, value);
        self
    }

    pub fn remote_config(mut self, config: Config, env: Env) -> Self {
        self.config.merge_remote_configs([config], &env);
        self
    }

    pub fn resource(mut self, resource: Resource) -> Self {
        self.config.set_resource(resource);
        self
    }

    pub fn build(self) -> DevConfig {
        self.config
    }
}

/// Builder for `LocalRunConfig`, backed by a [`MockApiClient`] and a
/// [`MockFileSystem`] unless told otherwise.
pub struct LocalRunConfigBuilder {
    config: LocalRunConfig,
}

impl LocalRunConfigBuilder {
    pub fn new(slug: &str) -> Self {
        let settings = ServerSettings::default();
        Self {
            config: LocalRunConfig {
                id: "run_test".to_string(),
                parent_run_id: None,
                name: slug.to_string(),
                slug: slug.to_string(),
                kind: TaskKind::Shell,
                kind_options: Map::new(),
                param_values: Map::new(),
                entrypoint: None,
                env: Env::studio(),
                task_env_vars: Default::default(),
                dev_config_env_vars: Default::default(),
                config_vars: Default::default(),
                fallback_env_slug: None,
                alias_to_resource: Default::default(),
                builtin: None,
                auth_info: settings.auth_info,
                api_host: settings.api_host,
                studio_url: settings.studio_url,
                tunnel_token: None,
                builtins_path: None,
                output_line_max_bytes: 0,
                remote: Arc::new(MockApiClient::new()),
                fs: Arc::new(MockFileSystem::new()),
                log_broker: LogBroker::new(),
                started: Arc::new(Notify::new()),
            },
        }
    }

    pub fn run_id(mut self, id: &str) -> Self {
        self.config.id = id.to_string();
        self
    }

    pub fn parent_run_id(mut self, id: &str) -> Self {
        self.config.parent_run_id = Some(id.to_string());
        self
    }

    pub fn kind(mut self, kind: TaskKind) -> Self {
        self.config.kind = kind;
        self
    }

    pub fn entrypoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.entrypoint = Some(path.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.param_values.insert(key.to_string(), value.into());
        self
    }

    pub fn kind_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.config.kind_options.insert(key.to_string(), value.into());
        self
    }

    pub fn env_var(mut self, key: &str, value: EnvVarValue) -> Self {
        self.config.task_env_vars.insert(key.to_string(), value);
        self
    }

    pub fn dev_env_var(mut self, key: &str, value: &str) -> Self {
        self.config
            .dev_config_env_vars
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn config_var(mut self, name: &str, value: &str) -> Self {
        self.config
            .config_vars
            .insert(name.to_string(), ConfigWithEnv::local(name, value));
        self
    }

    pub fn remote_config(mut self, config: Config, env: Env) -> Self {
        self.config
            .config_vars
            .insert(config.name.clone(), ConfigWithEnv::remote(config, env));
        self
    }

    pub fn fallback_env(mut self, slug: &str) -> Self {
        self.config.fallback_env_slug = Some(slug.to_string());
        self
    }

    pub fn resource(mut self, alias: &str, resource: Resource) -> Self {
        self.config
            .alias_to_resource
            .insert(alias.to_string(), resource);
        self
    }

    pub fn tunnel_token(mut self, token: &str) -> Self {
        self.config.tunnel_token = Some(token.to_string());
        self
    }

    pub fn builtins_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.builtins_path = Some(path.into());
        self
    }

    pub fn output_line_max_bytes(mut self, max: usize) -> Self {
        self.config.output_line_max_bytes = max;
        self
    }

    pub fn remote(mut self, remote: Arc<dyn RemoteApi>) -> Self {
        self.config.remote = remote;
        self
    }

    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.config.fs = fs;
        self
    }

    pub fn build(self) -> LocalRunConfig {
        self.config
    }
}

/// Server state with default settings and the real filesystem.
pub fn server_state(
    remote: Arc<dyn RemoteApi>,
    executor: Arc<dyn Executor>,
    dev_config: DevConfig,
) -> Arc<ServerState> {
    Arc::new(ServerState::new(
        remote,
        executor,
        dev_config,
        ServerSettings::default(),
    ))
}
