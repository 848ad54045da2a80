// src/state/mod.rs

//! Server-owned state shared by the executor and the handlers.
//!
//! Everything lives on [`ServerState`], which is constructed once at startup
//! and passed around behind an `Arc`.

pub mod run;
pub mod runs;
pub mod store;

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::api::{Env, ListConfigsRequest, RemoteApi, types::STUDIO_ENV_SLUG};
use crate::config::{DevConfig, ServerSettings};
use crate::errors::Result;
use crate::exec::Executor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{TaskConfig, ViewConfig};

pub use run::{LocalRun, RunStatus, generate_run_id};
pub use runs::RunStore;
pub use store::Store;

#[derive(Debug)]
pub struct ServerState {
    pub runs: RunStore,
    /// Discovered tasks by slug.
    pub tasks: Store<String, TaskConfig>,
    /// Discovered views by slug.
    pub views: Store<String, ViewConfig>,
    envs: Store<String, Env>,
    dev_config: RwLock<DevConfig>,
    pub remote: Arc<dyn RemoteApi>,
    pub executor: Arc<dyn Executor>,
    pub fs: Arc<dyn FileSystem>,
    pub settings: ServerSettings,
}

impl ServerState {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        executor: Arc<dyn Executor>,
        dev_config: DevConfig,
        settings: ServerSettings,
    ) -> Self {
        Self {
            runs: RunStore::new(),
            tasks: Store::new(),
            views: Store::new(),
            envs: Store::new(),
            dev_config: RwLock::new(dev_config),
            remote,
            executor,
            fs: Arc::new(RealFileSystem),
            settings,
        }
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn register_task(&self, task: TaskConfig) {
        self.tasks.add(task.slug.clone(), task);
    }

    pub fn register_view(&self, view: ViewConfig) {
        self.views.add(view.slug.clone(), view);
    }

    /// Snapshot of the current dev config.
    pub fn dev_config(&self) -> DevConfig {
        self.dev_config
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Mutate the dev config and persist it if it is backed by a file.
    pub fn update_dev_config<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut DevConfig) -> Result<()>,
    {
        let mut config = self.dev_config.write().unwrap_or_else(|p| p.into_inner());
        f(&mut config)?;
        if config.path.is_some() {
            config.save(self.fs.as_ref())?;
        }
        Ok(())
    }

    /// Look up an environment by slug, caching remote answers.
    pub async fn get_env(&self, slug: &str) -> Result<Env> {
        if slug.is_empty() || slug == STUDIO_ENV_SLUG {
            return Ok(Env::studio());
        }
        if let Some(env) = self.envs.get(&slug.to_string()) {
            return Ok(env);
        }

        debug!(env = slug, "fetching env from remote api");
        let env = self.remote.get_env(slug).await?;
        self.envs.add(slug.to_string(), env.clone());
        Ok(env)
    }

    /// Add the configs of the fallback env to `dev_config`. Configs defined
    /// locally keep their value. Without a fallback env this does nothing.
    pub async fn merge_fallback_configs(&self, dev_config: &mut DevConfig) -> Result<()> {
        let Some(slug) = self
            .settings
            .fallback_env_slug
            .as_deref()
            .filter(|s| !s.is_empty())
        else {
            return Ok(());
        };

        let env = self.get_env(slug).await?;
        let listed = self
            .remote
            .list_configs(ListConfigsRequest {
                env_slug: Some(env.slug.clone()),
                ..ListConfigsRequest::default()
            })
            .await?;
        debug!(env = %env.slug, count = listed.configs.len(), "merging remote configs");
        dev_config.merge_remote_configs(listed.configs, &env);
        Ok(())
    }
}
