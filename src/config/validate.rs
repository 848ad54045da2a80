// src/config/validate.rs

use crate::config::model::{DevConfig, RawDevConfig};
use crate::errors::{AirdevError, Result};

impl TryFrom<RawDevConfig> for DevConfig {
    type Error = crate::errors::AirdevError;

    fn try_from(raw: RawDevConfig) -> std::result::Result<Self, Self::Error> {
        validate_dev_config(&raw)?;
        DevConfig::new_unchecked(raw)
    }
}

pub fn validate_dev_config(cfg: &RawDevConfig) -> Result<()> {
    validate_env_vars(cfg)?;
    validate_config_vars(cfg)?;
    validate_resources(cfg)?;
    Ok(())
}

/// Env var names: letters, digits and `_`, not starting with a digit.
pub fn is_valid_env_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_env_vars(cfg: &RawDevConfig) -> Result<()> {
    for key in cfg.env_vars.keys() {
        if !is_valid_env_var_name(key) {
            return Err(AirdevError::ConfigError(format!(
                "[env_vars] key '{}' is not a valid environment variable name",
                key
            )));
        }
    }
    Ok(())
}

fn validate_config_vars(cfg: &RawDevConfig) -> Result<()> {
    for name in cfg.config_vars.keys() {
        if name.trim().is_empty() {
            return Err(AirdevError::ConfigError(
                "[config_vars] contains an empty config name".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_resources(cfg: &RawDevConfig) -> Result<()> {
    for (slug, resource) in cfg.resources.iter() {
        if slug.trim().is_empty() {
            return Err(AirdevError::ConfigError(
                "[resources] contains an empty resource slug".to_string(),
            ));
        }
        if resource.kind.trim().is_empty() {
            return Err(AirdevError::ConfigError(format!(
                "resource '{}' is missing `kind`",
                slug
            )));
        }
        if let Some(id) = &resource.id {
            if id.trim().is_empty() {
                return Err(AirdevError::ConfigError(format!(
                    "resource '{}' has an empty `id`",
                    slug
                )));
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    for (slug, resource) in cfg.resources.iter() {
        if let Some(id) = &resource.id {
            if !seen.insert(id.as_str()) {
                return Err(AirdevError::ConfigError(format!(
                    "resource '{}' reuses id '{}'",
                    slug, id
                )));
            }
        }
    }
    Ok(())
}
