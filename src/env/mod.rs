// src/env/mod.rs

//! Environment resolution for local runs and views.
//!
//! - [`resolve`] layers declared variables, dotenv files, dev config
//!   overrides, config values and templates.
//! - [`dotenv`] finds and reads dotenv files.
//! - [`builtin_vars`] holds the variables the server injects itself.
//! - [`token`] builds the local run identifier passed as `AIRPLANE_TOKEN`.

pub mod builtin_vars;
pub mod dotenv;
pub mod resolve;
pub mod token;

pub use builtin_vars::{common_env_vars, discovery_env_vars, filtered_system_env_vars};
pub use resolve::{
    ViewEnvConfig, apply_env_var_file_overrides, config_value, env_vars_for_view,
    materialize_env_vars, task_env_vars,
};
pub use token::{LocalRunClaims, generate_local_run_identifier, parse_local_run_identifier};
