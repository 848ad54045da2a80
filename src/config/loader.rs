// src/config/loader.rs

use std::path::{Path, PathBuf};

use crate::config::model::{DevConfig, RawDevConfig};
use crate::errors::{AirdevError, Result};
use crate::fs::FileSystem;

pub const DEV_CONFIG_FILE_NAME: &str = "airplane.dev.toml";

/// Load a dev config file and return the raw `RawDevConfig`.
///
/// This only performs TOML deserialization. Use [`load_and_validate`] for
/// the checked form.
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawDevConfig> {
    let contents = fs.read_to_string(path.as_ref())?;

    let config: RawDevConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a dev config file and validate it.
///
/// The returned config remembers `path`, so it can be saved back after
/// runtime updates.
pub fn load_and_validate(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<DevConfig> {
    let raw_config = load_from_path(fs, &path)?;
    let config = DevConfig::try_from(raw_config)?;
    Ok(config.with_path(path.as_ref()))
}

/// Like [`load_and_validate`], but a missing file yields an empty config
/// bound to `path`.
pub fn load_or_default(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<DevConfig> {
    if !fs.exists(path.as_ref()) {
        return Ok(DevConfig::default().with_path(path.as_ref()));
    }
    load_and_validate(fs, path)
}

/// `airplane.dev.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEV_CONFIG_FILE_NAME)
}

impl DevConfig {
    /// Write the locally-defined parts of this config back to its path.
    pub fn save(&self, fs: &dyn FileSystem) -> Result<()> {
        let path = self.path.as_ref().ok_or_else(|| {
            AirdevError::ConfigError("dev config has no file path to save to".to_string())
        })?;
        let contents = toml::to_string_pretty(&self.to_raw())?;
        fs.write(path, contents.as_bytes())?;
        tracing::info!(path = %path.display(), "wrote dev config");
        Ok(())
    }
}
