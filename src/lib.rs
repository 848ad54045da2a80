// src/lib.rs

pub mod api;
pub mod builtins;
pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod handlers;
pub mod logging;
pub mod logs;
pub mod outputs;
pub mod runtime;
pub mod state;
pub mod types;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::api::{ApiAuth, HttpApiClient, OfflineApiClient, RemoteApi};
use crate::cli::CliArgs;
use crate::config::{DevConfig, ServerSettings, load_or_default};
use crate::exec::LocalExecutor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::handlers::{CancelRunRequest, ExecuteTaskRequest, PrepareRunRequest};
use crate::state::{RunStatus, ServerState};
use crate::types::{EnvVarValue, TaskConfig, TaskKind, Values};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - dev config loading
/// - the remote API client (or the offline one)
/// - server state with the local executor
/// - Ctrl-C handling (cancels the run)
///
/// and then executes the task through the same handler the dev server uses.
pub async fn run(args: CliArgs) -> Result<()> {
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let dev_config = load_or_default(fs.as_ref(), &args.config)?;
    let task = task_from_args(&args)?;

    if args.dry_run {
        print_dry_run(&task, &dev_config);
        return Ok(());
    }

    let remote = remote_client(&args)?;
    let settings = ServerSettings {
        fallback_env_slug: args.env_slug.clone(),
        builtins_path: args.builtins.clone(),
        ..ServerSettings::default()
    };
    let state = Arc::new(
        ServerState::new(remote, Arc::new(LocalExecutor::new()), dev_config, settings)
            .with_fs(fs),
    );
    state.register_task(task.clone());

    let param_values = parse_assignments(&args.params)?;
    let prepared = handlers::prepare_run(
        &state,
        PrepareRunRequest {
            task_slug: task.slug.clone(),
            param_values: param_values.clone(),
        },
    )?;
    info!(run_id = %prepared.id, task = %task.slug, "prepared run");

    // Ctrl-C → cancel the run; the executor finalizes it.
    {
        let state = state.clone();
        let run_id = prepared.id.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let req = CancelRunRequest {
                run_id,
                cancelled_by: None,
            };
            if let Err(e) = handlers::cancel_run(&state, req) {
                warn!(error = %e, "cancelling run");
            }
        });
    }

    let finished = handlers::execute_task(
        &state,
        ExecuteTaskRequest {
            run_id: Some(prepared.id),
            slug: task.slug.clone(),
            param_values,
            ..ExecuteTaskRequest::default()
        },
    )
    .await?;

    let report = json!({ "run": &finished, "output": &finished.outputs });
    println!("{}", serde_json::to_string_pretty(&report)?);

    match finished.status {
        RunStatus::Succeeded => Ok(()),
        status => bail!("run {} finished as {:?}", finished.id, status),
    }
}

/// Describe the task given on the command line.
pub fn task_from_args(args: &CliArgs) -> Result<TaskConfig> {
    let entrypoint = std::path::absolute(&args.file)
        .with_context(|| format!("resolving entrypoint {:?}", args.file))?;

    let kind = match args.kind.as_deref() {
        Some(kind) => kind.parse::<TaskKind>().map_err(|e| anyhow!(e))?,
        None => infer_kind(&entrypoint),
    };

    let slug = match &args.slug {
        Some(slug) => slug.clone(),
        None => entrypoint
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("cannot derive a task slug from {:?}", args.file))?,
    };

    let env_vars = parse_pairs(&args.env_vars)?
        .into_iter()
        .map(|(key, value)| (key, EnvVarValue::literal(value)))
        .collect();

    let mut kind_options = parse_assignments(&args.kind_options)?;
    // A SQL file given directly is its own query file.
    if kind == TaskKind::Sql && !kind_options.contains_key("entrypoint") {
        if let Some(name) = entrypoint.file_name() {
            kind_options.insert(
                "entrypoint".to_string(),
                Value::String(name.to_string_lossy().into_owned()),
            );
        }
    }

    Ok(TaskConfig {
        name: slug.clone(),
        slug,
        kind,
        kind_options,
        entrypoint: Some(entrypoint),
        env_vars,
        resources: parse_pairs(&args.resources)?,
        ..TaskConfig::default()
    })
}

fn infer_kind(entrypoint: &Path) -> TaskKind {
    let kind = match entrypoint.extension().and_then(|e| e.to_str()) {
        Some("sql") => TaskKind::Sql,
        _ => runtime::lookup(Some(entrypoint), TaskKind::Shell)
            .map(|rt| rt.kind())
            .unwrap_or_default(),
    };
    debug!(?entrypoint, %kind, "inferred task kind");
    kind
}

/// The remote API client for `args`, or the offline one without a host.
pub fn remote_client(args: &CliArgs) -> Result<Arc<dyn RemoteApi>> {
    let Some(host) = &args.api_host else {
        if let Some(env) = &args.env_slug {
            bail!("--env {env} requires --api-host");
        }
        return Ok(Arc::new(OfflineApiClient));
    };

    let auth = match (&args.token, &args.api_key, &args.team_id) {
        (Some(token), _, _) => ApiAuth::Token(token.clone()),
        (None, Some(key), Some(team_id)) => ApiAuth::ApiKey {
            key: key.clone(),
            team_id: team_id.clone(),
        },
        (None, Some(_), None) => bail!("--api-key requires --team-id"),
        (None, None, _) => bail!("--api-host requires --token or --api-key"),
    };
    Ok(Arc::new(HttpApiClient::new(host.clone(), auth)))
}

/// Split `KEY=VALUE` arguments.
fn parse_pairs(items: &[String]) -> Result<BTreeMap<String, String>> {
    items
        .iter()
        .map(|item| {
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| anyhow!("expected KEY=VALUE, got {item:?}"))?;
            if key.is_empty() {
                bail!("empty key in {item:?}");
            }
            Ok((key.to_string(), value.to_string()))
        })
        .collect()
}

/// `KEY=VALUE` arguments whose values are JSON when they parse as JSON and
/// strings otherwise.
fn parse_assignments(items: &[String]) -> Result<Values> {
    Ok(parse_pairs(items)?
        .into_iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            (key, value)
        })
        .collect())
}

/// Simple dry-run output: print the task and the dev config it would use.
fn print_dry_run(task: &TaskConfig, dev_config: &DevConfig) {
    println!("airdev dry-run");
    println!("  task.slug = {}", task.slug);
    println!("  task.kind = {}", task.kind);
    if let Some(entrypoint) = &task.entrypoint {
        println!("  task.entrypoint = {}", entrypoint.display());
    }
    if !task.kind_options.is_empty() {
        println!("  task.kind_options = {}", Value::Object(task.kind_options.clone()));
    }
    if !task.env_vars.is_empty() {
        println!("  task.env_vars = {:?}", task.env_vars.keys().collect::<Vec<_>>());
    }
    for (alias, slug) in &task.resources {
        println!("  task.resources.{alias} = {slug}");
    }
    println!();

    match &dev_config.path {
        Some(path) => println!("dev config: {}", path.display()),
        None => println!("dev config: (none)"),
    }
    println!("  env_vars ({}):", dev_config.env_vars.len());
    for name in dev_config.env_vars.keys() {
        println!("    - {name}");
    }
    println!("  config_vars ({}):", dev_config.config_vars.len());
    for name in dev_config.config_vars.keys() {
        println!("    - {name}");
    }
    println!("  resources ({}):", dev_config.resources.len());
    for (slug, resource) in &dev_config.resources {
        println!("    - {slug} ({}, id {})", resource.resource.kind, resource.resource.id);
    }

    debug!("dry-run complete (no execution)");
}
