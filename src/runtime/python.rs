// src/runtime/python.rs

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{PrepareRunOptions, Runtime, nearest_root_with, params_json};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::TaskKind;

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonRuntime;

impl Runtime for PythonRuntime {
    fn kind(&self) -> TaskKind {
        TaskKind::Python
    }

    fn root(&self, fs: &dyn FileSystem, entrypoint: &Path) -> Result<PathBuf> {
        Ok(nearest_root_with(fs, entrypoint, "requirements.txt"))
    }

    fn prepare_run(&self, opts: &PrepareRunOptions<'_>) -> Result<Vec<String>> {
        let python = opts
            .kind_options
            .get("python")
            .and_then(Value::as_str)
            .unwrap_or("python3");

        Ok(vec![
            python.to_string(),
            opts.entrypoint.to_string_lossy().into_owned(),
            params_json(opts.param_values)?,
        ])
    }
}
