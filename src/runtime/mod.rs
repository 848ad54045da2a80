// src/runtime/mod.rs

//! Per-kind command builders.
//!
//! A runtime knows where a task's project root is (for dotenv discovery) and
//! how to turn an entrypoint plus parameter values into a command line.

pub mod node;
pub mod python;
pub mod shell;

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::errors::{AirdevError, Result};
use crate::fs::FileSystem;
use crate::types::{TaskKind, Values};

pub use node::NodeRuntime;
pub use python::PythonRuntime;
pub use shell::ShellRuntime;

pub struct PrepareRunOptions<'a> {
    pub entrypoint: &'a Path,
    pub param_values: &'a Values,
    pub kind_options: &'a Values,
}

pub trait Runtime: Send + Sync + Debug {
    fn kind(&self) -> TaskKind;

    /// Project root for `entrypoint`.
    fn root(&self, fs: &dyn FileSystem, entrypoint: &Path) -> Result<PathBuf>;

    fn supports_local_execution(&self) -> bool {
        true
    }

    /// The argv to execute.
    fn prepare_run(&self, opts: &PrepareRunOptions<'_>) -> Result<Vec<String>>;
}

/// Container-image tasks. Known, but not runnable locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRuntime;

impl Runtime for ImageRuntime {
    fn kind(&self) -> TaskKind {
        TaskKind::Image
    }

    fn root(&self, _fs: &dyn FileSystem, entrypoint: &Path) -> Result<PathBuf> {
        Ok(entrypoint_dir(entrypoint))
    }

    fn supports_local_execution(&self) -> bool {
        false
    }

    fn prepare_run(&self, _opts: &PrepareRunOptions<'_>) -> Result<Vec<String>> {
        Err(AirdevError::UnsupportedFileType(TaskKind::Image.to_string()))
    }
}

static SHELL: ShellRuntime = ShellRuntime;
static PYTHON: PythonRuntime = PythonRuntime;
static NODE: NodeRuntime = NodeRuntime;
static IMAGE: ImageRuntime = ImageRuntime;

/// Find the runtime for an entrypoint, by file extension first and by task
/// kind otherwise.
pub fn lookup(entrypoint: Option<&Path>, kind: TaskKind) -> Result<&'static dyn Runtime> {
    let by_extension = entrypoint
        .and_then(|p| p.extension())
        .and_then(|ext| ext.to_str())
        .and_then(runtime_for_extension);
    if let Some(runtime) = by_extension {
        return Ok(runtime);
    }

    match kind {
        TaskKind::Shell => Ok(&SHELL),
        TaskKind::Python => Ok(&PYTHON),
        TaskKind::Node => Ok(&NODE),
        TaskKind::Image => Ok(&IMAGE),
        TaskKind::Sql | TaskKind::Rest | TaskKind::Builtin => {
            let name = entrypoint
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| kind.to_string());
            Err(AirdevError::UnsupportedFileType(name))
        }
    }
}

fn runtime_for_extension(ext: &str) -> Option<&'static dyn Runtime> {
    match ext {
        "sh" => Some(&SHELL),
        "py" => Some(&PYTHON),
        "js" | "ts" | "mjs" | "cjs" | "jsx" | "tsx" => Some(&NODE),
        _ => None,
    }
}

pub(crate) fn entrypoint_dir(entrypoint: &Path) -> PathBuf {
    entrypoint
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Closest directory at or above the entrypoint's directory that contains
/// `marker`, or the entrypoint's directory when there is none.
pub(crate) fn nearest_root_with(fs: &dyn FileSystem, entrypoint: &Path, marker: &str) -> PathBuf {
    let start = entrypoint_dir(entrypoint);
    start
        .ancestors()
        .find(|dir| fs.is_file(&dir.join(marker)))
        .map(Path::to_path_buf)
        .unwrap_or(start)
}

/// Parameter values as the single JSON argument most runtimes take.
pub(crate) fn params_json(param_values: &Values) -> Result<String> {
    Ok(serde_json::to_string(param_values)?)
}
