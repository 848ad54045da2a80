// src/exec/local.rs

//! Runs tasks as local child processes.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, anyhow};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{Executor, RunOutcome};
use super::collector::{OutputCollector, OutputStream};
use super::config::LocalRunConfig;
use super::expressions::{
    StrictMode, base_evaluate_template_request, interpolate_object, interpolate_resources,
};
use crate::builtins::BuiltinClient;
use crate::env::task_env_vars;
use crate::errors::{AirdevError, Result};
use crate::outputs::ParseOptions;
use crate::runtime::{self, PrepareRunOptions};

const LINE_QUEUE_CAPACITY: usize = 1024;
/// Longest line kept in memory when no output line limit is configured.
const MAX_BUFFERED_LINE_BYTES: usize = 16 * 1024 * 1024;

/// [`Executor`] that spawns the task as a child process of the server.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for LocalExecutor {
    fn execute(
        &self,
        config: LocalRunConfig,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = RunOutcome> + Send + '_>> {
        Box::pin(async move {
            match execute_run(&config, &cancel).await {
                Ok(outcome) => outcome,
                Err(err) => RunOutcome::Failed {
                    outputs: Value::Null,
                    error: format!("{err:#}"),
                },
            }
        })
    }
}

struct PreparedCommand {
    argv: Vec<String>,
    env: Vec<(String, String)>,
    dir: Option<PathBuf>,
}

enum Prepared {
    Ready(PreparedCommand),
    Skipped { reason: String },
}

async fn execute_run(config: &LocalRunConfig, cancel: &CancellationToken) -> Result<RunOutcome> {
    let prepared = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!(run_id = %config.id, task = %config.slug, "run cancelled before start");
            return Ok(RunOutcome::Cancelled { outputs: Value::Null });
        }
        prepared = prepare(config) => prepared?,
    };

    match prepared {
        Prepared::Ready(command) => run_process(config, command, cancel).await,
        Prepared::Skipped { reason } => Ok(RunOutcome::Skipped { reason }),
    }
}

fn unsupported(config: &LocalRunConfig) -> Prepared {
    Prepared::Skipped {
        reason: format!(
            "Local execution is not supported for this task (kind={})",
            config.kind
        ),
    }
}

/// Build the command line and environment. Every remote call of the run
/// happens here, before anything is started.
async fn prepare(config: &LocalRunConfig) -> Result<Prepared> {
    let remote = config.remote.as_ref();
    let mut base = base_evaluate_template_request(config);
    base.resources = interpolate_resources(remote, &base, &config.alias_to_resource).await?;

    if let Some(request) = &config.builtin {
        let mut request = request.clone();
        request.request = interpolate_object(remote, &base, StrictMode::On, &request.request).await?;

        let client = BuiltinClient::locate(config.fs.as_ref(), config.builtins_path.as_deref())?;
        let argv = client.command(&request)?;
        let env = task_env_vars(config, None, &base).await?;
        return Ok(Prepared::Ready(PreparedCommand {
            argv,
            env,
            dir: None,
        }));
    }

    let Some(entrypoint) = config.entrypoint.as_deref() else {
        return Ok(unsupported(config));
    };
    let runtime = match runtime::lookup(Some(entrypoint), config.kind) {
        Ok(runtime) if runtime.supports_local_execution() => runtime,
        Ok(_) | Err(AirdevError::UnsupportedFileType(_)) => return Ok(unsupported(config)),
        Err(err) => return Err(err),
    };

    let kind_options =
        interpolate_object(remote, &base, StrictMode::On, &config.kind_options).await?;
    let argv = runtime.prepare_run(&PrepareRunOptions {
        entrypoint,
        param_values: &config.param_values,
        kind_options: &kind_options,
    })?;

    let root = runtime.root(config.fs.as_ref(), entrypoint)?;
    let env = task_env_vars(config, Some(&root), &base).await?;

    Ok(Prepared::Ready(PreparedCommand {
        argv,
        env,
        dir: Some(root),
    }))
}

async fn run_process(
    config: &LocalRunConfig,
    prepared: PreparedCommand,
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    let (program, args) = prepared
        .argv
        .split_first()
        .ok_or_else(|| anyhow!("empty command line for task {}", config.slug))?;

    info!(
        run_id = %config.id,
        task = %config.slug,
        cmd = %prepared.argv.join(" "),
        "starting task process"
    );

    let mut command = Command::new(program);
    command
        .args(args)
        .env_clear()
        .envs(prepared.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &prepared.dir {
        command.current_dir(dir);
    }

    config.started.notify_one();
    let mut child = command.spawn().context("starting")?;
    let stdout = child.stdout.take().context("stdout")?;
    let stderr = child.stderr.take().context("stderr")?;

    let (line_tx, mut line_rx) = mpsc::channel(LINE_QUEUE_CAPACITY);
    let keep = match config.output_line_max_bytes {
        0 => MAX_BUFFERED_LINE_BYTES,
        max => max.saturating_add(1),
    };
    let stdout_task = tokio::spawn(drain_lines(stdout, OutputStream::Stdout, keep, line_tx.clone()));
    let stderr_task = tokio::spawn(drain_lines(stderr, OutputStream::Stderr, keep, line_tx));

    let mut collector = OutputCollector::new(
        config.id.clone(),
        config.slug.clone(),
        config.log_broker.clone(),
        ParseOptions {
            max_line_bytes: config.output_line_max_bytes,
        },
    );

    let mut cancelled = false;
    loop {
        tokio::select! {
            _ = cancel.cancelled(), if !cancelled => {
                cancelled = true;
                info!(
                    run_id = %config.id,
                    task = %config.slug,
                    "cancellation requested; killing task process"
                );
                if let Err(e) = child.start_kill() {
                    warn!(
                        run_id = %config.id,
                        task = %config.slug,
                        error = %e,
                        "failed to kill task process on cancellation"
                    );
                }
                // Grandchildren may keep the pipes open.
                stdout_task.abort();
                stderr_task.abort();
            }
            line = line_rx.recv() => match line {
                Some((stream, text)) => collector.handle_line(stream, &text),
                None => break,
            },
        }
    }

    let scan_result = drain_result(stdout_task.await, cancelled)
        .and(drain_result(stderr_task.await, cancelled));

    let outputs = collector.into_document();
    let status = match child.wait().await {
        Ok(status) => status,
        Err(err) => {
            return Ok(RunOutcome::Failed {
                outputs,
                error: format!("waiting: {err}"),
            });
        }
    };

    debug!(
        run_id = %config.id,
        task = %config.slug,
        exit_code = status.code().unwrap_or(-1),
        success = status.success(),
        "task process exited"
    );

    if cancelled {
        return Ok(RunOutcome::Cancelled { outputs });
    }
    if let Err(err) = scan_result {
        return Ok(RunOutcome::Failed {
            outputs,
            error: format!("{err:#}"),
        });
    }
    if !status.success() {
        return Ok(RunOutcome::Failed {
            outputs,
            error: status.to_string(),
        });
    }
    Ok(RunOutcome::Succeeded { outputs })
}

fn drain_result(
    joined: std::result::Result<anyhow::Result<()>, JoinError>,
    cancelled: bool,
) -> anyhow::Result<()> {
    match joined {
        Ok(result) => result,
        Err(err) if cancelled && err.is_cancelled() => Ok(()),
        Err(err) => Err(anyhow::Error::new(err).context("scanning logs")),
    }
}

/// Forward every line of `reader` until EOF. Lines are cut after `keep`
/// bytes, which still marks output commands as too long. Invalid UTF-8 is
/// replaced rather than ending the stream.
async fn drain_lines<R>(
    reader: R,
    stream: OutputStream,
    keep: usize,
    tx: mpsc::Sender<(OutputStream, String)>,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let more = read_line_capped(&mut reader, &mut buf, keep)
            .await
            .with_context(|| format!("scanning logs ({stream})"))?;
        if !more {
            return Ok(());
        }

        let line = String::from_utf8_lossy(trim_line_ending(&buf)).into_owned();
        if tx.send((stream, line)).await.is_err() {
            return Ok(());
        }
    }
}

/// Read one line into `buf`, keeping at most `keep` bytes and skipping the
/// rest of it. Returns false at EOF.
async fn read_line_capped<R>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
    keep: usize,
) -> std::io::Result<bool>
where
    R: AsyncRead + Unpin,
{
    let mut read_any = false;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(read_any);
        }
        read_any = true;

        let (used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        let room = keep.saturating_sub(buf.len());
        buf.extend_from_slice(&available[..used.min(room)]);
        reader.consume(used);
        if done {
            return Ok(true);
        }
    }
}

fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let buf = buf.strip_suffix(b"\n").unwrap_or(buf);
    buf.strip_suffix(b"\r").unwrap_or(buf)
}
