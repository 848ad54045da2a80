// src/handlers/tasks.rs

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use super::{ApiError, HandlerResult};
use crate::api::types::STUDIO_ENV_SLUG;
use crate::builtins::{StdApiRequest, builtin_request, builtin_request_for_task, is_builtin_slug};
use crate::config::DevConfig;
use crate::env::parse_local_run_identifier;
use crate::errors::AirdevError;
use crate::exec::{LocalRunConfig, RunOutcome};
use crate::logs::{LogBroker, LogItem};
use crate::state::{LocalRun, RunStatus, ServerState, generate_run_id};
use crate::types::{Resource, TaskConfig, TaskKind, Values};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteTaskRequest {
    /// Pre-allocated run to execute, see [`prepare_run`].
    #[serde(rename = "runID", default)]
    pub run_id: Option<String>,
    pub slug: String,
    #[serde(default)]
    pub param_values: Values,
    /// Alias to resource id. Adds to or replaces the task's attachments.
    #[serde(default)]
    pub resources: BTreeMap<String, String>,
    #[serde(default)]
    pub env_slug: Option<String>,
    /// Local run identifier of the run that triggered this one.
    #[serde(default)]
    pub parent_run_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRunRequest {
    pub task_slug: String,
    #[serde(default)]
    pub param_values: Values,
}

/// What a request resolves to before anything runs.
struct ExecutionTarget {
    task: Option<TaskConfig>,
    slug: String,
    name: String,
    kind: Option<TaskKind>,
    builtin: Option<StdApiRequest>,
    resources: BTreeMap<String, Resource>,
}

/// Closes a run's log on every exit path, including panics, once the run
/// record has been finalized.
struct CloseLogOnDrop(LogBroker);

impl Drop for CloseLogOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

fn resolve_target(
    state: &ServerState,
    dev_config: &DevConfig,
    req: &ExecuteTaskRequest,
) -> HandlerResult<ExecutionTarget> {
    if is_builtin_slug(&req.slug) {
        let builtin = builtin_request(&req.slug, &req.param_values)?;
        let resources = resources_by_id(dev_config, &req.resources)?;
        return Ok(ExecutionTarget {
            task: None,
            slug: req.slug.clone(),
            name: req.slug.clone(),
            kind: None,
            builtin: Some(builtin),
            resources,
        });
    }

    let task = state
        .tasks
        .get(&req.slug)
        .ok_or_else(|| AirdevError::NotFound(format!("task {}", req.slug)))?;

    let mut resources = BTreeMap::new();
    for (alias, slug) in &task.resources {
        let resource = dev_config.resources.get(slug).ok_or_else(|| {
            ApiError::bad_request(format!(
                "resource {slug} (attached to task {} as {alias}) is not defined in the dev config",
                task.slug
            ))
        })?;
        resources.insert(alias.clone(), resource.resource.clone());
    }
    resources.extend(resources_by_id(dev_config, &req.resources)?);

    let builtin = builtin_request_for_task(state.fs.as_ref(), &task, &req.param_values)?;

    Ok(ExecutionTarget {
        slug: task.slug.clone(),
        name: task.name.clone(),
        kind: Some(task.kind),
        builtin,
        resources,
        task: Some(task),
    })
}

fn resources_by_id(
    dev_config: &DevConfig,
    ids: &BTreeMap<String, String>,
) -> HandlerResult<BTreeMap<String, Resource>> {
    ids.iter()
        .map(|(alias, id)| {
            dev_config
                .resource_by_id(id)
                .map(|r| (alias.clone(), r.resource.clone()))
                .ok_or_else(|| ApiError::bad_request(format!("resource with id {id} not found")))
        })
        .collect()
}

/// Register a queued run so log watchers can attach before it executes.
pub fn prepare_run(state: &ServerState, req: PrepareRunRequest) -> HandlerResult<LocalRun> {
    let mut run = LocalRun::new(generate_run_id());
    match state.tasks.get(&req.task_slug) {
        Some(task) => {
            run.task_name = task.name;
            run.parameters = task.parameters;
            run.kind = Some(task.kind);
        }
        None if is_builtin_slug(&req.task_slug) => {
            run.task_name = req.task_slug.clone();
            run.is_std_api = true;
        }
        None => return Err(AirdevError::NotFound(format!("task {}", req.task_slug)).into()),
    }
    run.task_id = req.task_slug.clone();
    run.param_values = req.param_values;

    let id = run.id.clone();
    Ok(state.runs.add(&req.task_slug, &id, run))
}

/// Execute a task (or builtin) locally and wait for it to finish.
///
/// Returns the finalized run. Tasks whose kind cannot run locally are
/// skipped with a warning and finalized as succeeded with no output. The run
/// stays queued until the executor starts its process.
pub async fn execute_task(state: &ServerState, req: ExecuteTaskRequest) -> HandlerResult<LocalRun> {
    let run_id = req
        .run_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generate_run_id);

    let (run, config) = match start_run(state, &run_id, req).await {
        Ok(started) => started,
        Err(err) => {
            abandon_run(state, &run_id, &err);
            return Err(err);
        }
    };

    let _close_log = CloseLogOnDrop(run.log_broker.clone());
    let slug = config.slug.clone();
    let started = config.started.clone();

    info!(run_id = %run_id, task = %slug, "executing task locally");
    let mut execution = state.executor.execute(config, run.cancel.clone());
    let outcome = tokio::select! {
        biased;
        outcome = &mut execution => outcome,
        _ = started.notified() => {
            mark_active(state, &run_id);
            execution.await
        }
    };
    finalize(state, &run, &slug, outcome)
}

/// Resolve everything the run needs and register it. Runs that were
/// prepared beforehand are updated in place, so a concurrent cancel is
/// never overwritten.
async fn start_run(
    state: &ServerState,
    run_id: &str,
    req: ExecuteTaskRequest,
) -> HandlerResult<(LocalRun, LocalRunConfig)> {
    let mut dev_config = state.dev_config();
    let target = resolve_target(state, &dev_config, &req)?;

    if target.builtin.is_some() && target.resources.len() != 1 {
        return Err(ApiError::bad_request(format!(
            "expected exactly one resource for builtin {}, got {}",
            target.slug,
            target.resources.len()
        )));
    }

    let parent_run_id = match req.parent_run_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => Some(parse_local_run_identifier(token)?.run_id).filter(|id| !id.is_empty()),
        None => None,
    };

    let env_slug = req
        .env_slug
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| STUDIO_ENV_SLUG.to_string());
    let env = state.get_env(&env_slug).await?;
    state.merge_fallback_configs(&mut dev_config).await?;

    let fill = |run: &mut LocalRun| {
        run.task_id = target.slug.clone();
        run.task_name = target.name.clone();
        run.kind = target.kind;
        run.param_values = req.param_values.clone();
        run.parameters = target
            .task
            .as_ref()
            .map(|t| t.parameters.clone())
            .unwrap_or_default();
        run.parent_id = parent_run_id.clone();
        run.creator_id = state.settings.auth_info.user().id;
        run.resources = target
            .resources
            .iter()
            .map(|(alias, r)| (alias.clone(), r.id.clone()))
            .collect();
        run.is_std_api = target.builtin.is_some();
        run.std_api_request = target.builtin.clone();
        run.env_slug = env.slug.clone();
    };

    let run = if state.runs.get(run_id).is_some() {
        let mut finished = None;
        let run = state.runs.update(run_id, |run| {
            if run.status.is_terminal() {
                finished = Some(run.status);
            } else {
                fill(run);
            }
            Ok(())
        })?;
        if let Some(status) = finished {
            return Err(ApiError::bad_request(format!(
                "run {run_id} has already finished ({status:?})"
            )));
        }
        state
            .runs
            .index_run(&target.slug, run_id, parent_run_id.as_deref());
        run
    } else {
        let mut run = LocalRun::new(run_id);
        fill(&mut run);
        state.runs.add(&target.slug, run_id, run)
    };

    let task = target.task.unwrap_or_default();
    let config = LocalRunConfig {
        id: run_id.to_string(),
        parent_run_id,
        name: target.name,
        slug: target.slug,
        kind: target.kind.unwrap_or(TaskKind::Builtin),
        kind_options: task.kind_options,
        param_values: req.param_values,
        entrypoint: task.entrypoint,
        env,
        task_env_vars: task.env_vars,
        dev_config_env_vars: dev_config.env_vars,
        config_vars: dev_config.config_vars,
        fallback_env_slug: state.settings.fallback_env_slug.clone(),
        alias_to_resource: target.resources,
        builtin: target.builtin,
        auth_info: state.settings.auth_info.clone(),
        api_host: state.settings.api_host.clone(),
        studio_url: state.settings.studio_url.clone(),
        tunnel_token: state.settings.tunnel_token.clone(),
        builtins_path: state.settings.builtins_path.clone(),
        output_line_max_bytes: state.settings.output_line_max_bytes,
        remote: state.remote.clone(),
        fs: state.fs.clone(),
        log_broker: run.log_broker.clone(),
        started: Arc::new(Notify::new()),
    };
    Ok((run, config))
}

/// Fail a prepared run whose execution could not start, so its watchers
/// see the end of the log.
fn abandon_run(state: &ServerState, run_id: &str, err: &ApiError) {
    let mut failed = false;
    // Unknown ids were never registered; nothing is waiting on them.
    let _ = state.runs.update(run_id, |run| {
        failed = run.transition(RunStatus::Failed);
        if failed {
            run.outputs = json!({ "error": err.message });
            run.log_broker.close();
        }
        Ok(())
    });
    if failed {
        warn!(run_id, error = %err.message, "run failed before starting");
    }
}

fn mark_active(state: &ServerState, run_id: &str) {
    if let Err(err) = state.runs.update(run_id, |run| {
        run.transition(RunStatus::Active);
        Ok(())
    }) {
        warn!(run_id, error = %err, "could not mark run active");
    }
}

fn finalize(
    state: &ServerState,
    run: &LocalRun,
    task_slug: &str,
    outcome: RunOutcome,
) -> HandlerResult<LocalRun> {
    let (status, outputs) = match outcome {
        RunOutcome::Succeeded { outputs } => (RunStatus::Succeeded, outputs),
        RunOutcome::Cancelled { outputs } => (RunStatus::Cancelled, outputs),
        RunOutcome::Failed { outputs, error } => {
            error!(run_id = %run.id, task = task_slug, error = %error, "run failed");
            let outputs = if outputs.is_null() {
                json!({ "error": error })
            } else {
                outputs
            };
            (RunStatus::Failed, outputs)
        }
        RunOutcome::Skipped { reason } => {
            warn!(run_id = %run.id, task = task_slug, "{}", reason);
            let insert_id = run.log_broker.history().len() as u64;
            run.log_broker
                .record(LogItem::new(insert_id, reason, task_slug));
            (RunStatus::Succeeded, serde_json::Value::Null)
        }
    };

    let finalized = state.runs.update(&run.id, |run| {
        if run.transition(status) {
            run.outputs = outputs;
        }
        Ok(())
    })?;

    info!(run_id = %finalized.id, task = task_slug, status = ?finalized.status, "run finished");
    Ok(finalized)
}
