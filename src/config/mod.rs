// src/config/mod.rs

//! Dev config loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load and save the dev config file (`loader.rs`).
//! - Validate names, ids and resource kinds (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigWithEnv, DevConfig, RawDevConfig, RawResource, ResourceWithEnv, ServerSettings};
pub use validate::{is_valid_env_var_name, validate_dev_config};
