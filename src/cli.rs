// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `airdev`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "airdev",
    version,
    about = "Run a task locally the way the dev server does.",
    long_about = None
)]
pub struct CliArgs {
    /// Task entrypoint to execute.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Path to the dev config file (TOML).
    ///
    /// Default: `airplane.dev.toml` in the current working directory. A
    /// missing file means an empty config.
    #[arg(long, value_name = "PATH", default_value = "airplane.dev.toml")]
    pub config: PathBuf,

    /// Task slug. Defaults to the entrypoint's file stem.
    #[arg(long)]
    pub slug: Option<String>,

    /// Task kind (shell, python, node, sql, rest, image, builtin).
    ///
    /// If omitted, it is inferred from the file extension.
    #[arg(long)]
    pub kind: Option<String>,

    /// Kind-specific option (e.g. `shell=zsh`); parsed as JSON when possible.
    #[arg(long = "kind-option", value_name = "KEY=VALUE")]
    pub kind_options: Vec<String>,

    /// Parameter value; the value is parsed as JSON when possible.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Environment variable declared on the task.
    #[arg(long = "env-var", value_name = "KEY=VALUE")]
    pub env_vars: Vec<String>,

    /// Attach the dev config resource SLUG to the task as ALIAS. SQL tasks
    /// need exactly one.
    #[arg(long = "resource", value_name = "ALIAS=SLUG")]
    pub resources: Vec<String>,

    /// Remote API host. Without it, templates pass through unchanged and
    /// remote configs are unavailable.
    #[arg(long, value_name = "HOST")]
    pub api_host: Option<String>,

    /// API key for the remote API (requires `--team-id`).
    #[arg(long)]
    pub api_key: Option<String>,

    /// Session token for the remote API.
    #[arg(long)]
    pub token: Option<String>,

    #[arg(long)]
    pub team_id: Option<String>,

    /// Remote env used for configs not defined in the dev config. Requires
    /// `--api-host`.
    #[arg(long = "env", value_name = "SLUG")]
    pub env_slug: Option<String>,

    /// Path to the builtins binary (otherwise `AIRDEV_BUILTINS_PATH`).
    #[arg(long, value_name = "PATH")]
    pub builtins: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `AIRDEV_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve the task and dev config and print them, but don't execute.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
