// src/exec/config.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Notify;

use crate::api::{AuthInfo, Env, RemoteApi};
use crate::builtins::StdApiRequest;
use crate::config::ConfigWithEnv;
use crate::fs::FileSystem;
use crate::logs::LogBroker;
use crate::types::{EnvVarValue, Resource, TaskKind, Values};

/// Everything the executor needs to run one task.
#[derive(Debug, Clone)]
pub struct LocalRunConfig {
    pub id: String,
    pub parent_run_id: Option<String>,
    pub name: String,
    pub slug: String,
    pub kind: TaskKind,
    pub kind_options: Values,
    pub param_values: Values,
    pub entrypoint: Option<PathBuf>,
    pub env: Env,

    /// Variables declared by the task.
    pub task_env_vars: BTreeMap<String, EnvVarValue>,
    /// Overrides from the dev config.
    pub dev_config_env_vars: BTreeMap<String, String>,
    pub config_vars: BTreeMap<String, ConfigWithEnv>,
    pub fallback_env_slug: Option<String>,
    /// Attached resources by alias.
    pub alias_to_resource: BTreeMap<String, Resource>,
    /// Set for runs executed by the builtins binary.
    pub builtin: Option<StdApiRequest>,

    pub auth_info: AuthInfo,
    /// Local API host handed to the process.
    pub api_host: String,
    pub studio_url: String,
    pub tunnel_token: Option<String>,
    pub builtins_path: Option<PathBuf>,
    pub output_line_max_bytes: usize,

    pub remote: Arc<dyn RemoteApi>,
    pub fs: Arc<dyn FileSystem>,
    pub log_broker: LogBroker,
    /// Notified right before the task process is spawned.
    pub started: Arc<Notify>,
}

impl LocalRunConfig {
    /// Config values templates may reference. Remote secrets are not
    /// included.
    pub fn config_values(&self) -> BTreeMap<String, String> {
        self.config_vars
            .iter()
            .filter(|(_, c)| !(c.remote && c.config.is_secret))
            .map(|(name, c)| (name.clone(), c.config.value.clone()))
            .collect()
    }
}
