// src/runtime/node.rs

use std::path::{Path, PathBuf};

use super::{PrepareRunOptions, Runtime, nearest_root_with, params_json};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::TaskKind;

/// JavaScript runs under `node`; TypeScript through `npx tsx`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeRuntime;

impl Runtime for NodeRuntime {
    fn kind(&self) -> TaskKind {
        TaskKind::Node
    }

    fn root(&self, fs: &dyn FileSystem, entrypoint: &Path) -> Result<PathBuf> {
        Ok(nearest_root_with(fs, entrypoint, "package.json"))
    }

    fn prepare_run(&self, opts: &PrepareRunOptions<'_>) -> Result<Vec<String>> {
        let entrypoint = opts.entrypoint.to_string_lossy().into_owned();
        let is_typescript = matches!(
            opts.entrypoint.extension().and_then(|e| e.to_str()),
            Some("ts" | "tsx")
        );

        let mut argv = if is_typescript {
            vec!["npx".to_string(), "tsx".to_string()]
        } else {
            vec!["node".to_string()]
        };
        argv.push(entrypoint);
        argv.push(params_json(opts.param_values)?);
        Ok(argv)
    }
}
