// src/runtime/shell.rs

use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{PrepareRunOptions, Runtime, entrypoint_dir};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::TaskKind;

/// Shell scripts run under `bash` (or `kindOptions.shell`), receiving each
/// parameter as a `slug=value` argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRuntime;

impl Runtime for ShellRuntime {
    fn kind(&self) -> TaskKind {
        TaskKind::Shell
    }

    fn root(&self, _fs: &dyn FileSystem, entrypoint: &Path) -> Result<PathBuf> {
        Ok(entrypoint_dir(entrypoint))
    }

    fn prepare_run(&self, opts: &PrepareRunOptions<'_>) -> Result<Vec<String>> {
        let shell = opts
            .kind_options
            .get("shell")
            .and_then(Value::as_str)
            .unwrap_or("bash");

        let mut argv = vec![
            shell.to_string(),
            opts.entrypoint.to_string_lossy().into_owned(),
        ];
        for (slug, value) in opts.param_values {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => String::new(),
                other => other.to_string(),
            };
            argv.push(format!("{slug}={value}"));
        }
        Ok(argv)
    }
}
