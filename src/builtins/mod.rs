// src/builtins/mod.rs

//! Builtin tasks: operations implemented by the platform (SQL queries, REST
//! requests, ...) rather than by user code.
//!
//! Locally they run through a separate builtins binary that takes a single
//! JSON request argument.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::errors::{AirdevError, Result};
use crate::fs::FileSystem;
use crate::types::{TaskConfig, TaskKind, Values};

pub const BUILTINS_SLUG_PREFIX: &str = "airplane";
pub const BUILTINS_PATH_ENV: &str = "AIRDEV_BUILTINS_PATH";

/// A builtin function, identified by namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpecification {
    pub namespace: String,
    pub name: String,
}

impl FunctionSpecification {
    pub fn slug(&self) -> String {
        format!("{}:{}_{}", BUILTINS_SLUG_PREFIX, self.namespace, self.name)
    }
}

/// Parse a slug of the form `airplane:<namespace>_<name>`.
pub fn function_specification(slug: &str) -> Result<FunctionSpecification> {
    let unknown = || AirdevError::NotFound(format!("builtin task {slug}"));

    let (prefix, rest) = slug.split_once(':').ok_or_else(unknown)?;
    if prefix != BUILTINS_SLUG_PREFIX || rest.contains(':') {
        return Err(unknown());
    }
    let (namespace, name) = rest.split_once('_').ok_or_else(unknown)?;
    if namespace.is_empty() || name.is_empty() || name.contains('_') {
        return Err(unknown());
    }

    Ok(FunctionSpecification {
        namespace: namespace.to_string(),
        name: name.to_string(),
    })
}

pub fn is_builtin_slug(slug: &str) -> bool {
    function_specification(slug).is_ok()
}

/// Read `functionSpecification: {namespace, name}` from a builtin task's
/// kind options.
pub fn function_specification_from_kind_options(
    kind_options: &Values,
) -> Result<FunctionSpecification> {
    let spec = kind_options.get("functionSpecification").ok_or_else(|| {
        AirdevError::ConfigError("missing functionSpecification in kind options".to_string())
    })?;
    serde_json::from_value(spec.clone()).map_err(|e| {
        AirdevError::ConfigError(format!("invalid functionSpecification in kind options: {e}"))
    })
}

/// The request the builtins binary receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdApiRequest {
    pub namespace: String,
    pub name: String,
    pub request: Values,
}

impl StdApiRequest {
    pub fn new(spec: FunctionSpecification, request: Values) -> Self {
        Self {
            namespace: spec.namespace,
            name: spec.name,
            request,
        }
    }

    pub fn slug(&self) -> String {
        format!("{}:{}_{}", BUILTINS_SLUG_PREFIX, self.namespace, self.name)
    }
}

/// Request for a builtin invoked directly by slug.
pub fn builtin_request(slug: &str, param_values: &Values) -> Result<StdApiRequest> {
    let spec = function_specification(slug)?;
    Ok(StdApiRequest::new(spec, param_values.clone()))
}

/// Tasks whose kind is backed by a builtin: SQL runs as `sql_query`, REST as
/// `rest_request`, and builtin-kind tasks name their function in the kind
/// options. Other kinds return `None`.
pub fn builtin_request_for_task(
    fs: &dyn FileSystem,
    task: &TaskConfig,
    param_values: &Values,
) -> Result<Option<StdApiRequest>> {
    let request = match task.kind {
        TaskKind::Sql => {
            let mut request = task.kind_options.clone();
            let query_file = request
                .remove("entrypoint")
                .and_then(|v| v.as_str().map(str::to_string))
                .ok_or_else(|| {
                    AirdevError::ConfigError(format!(
                        "sql task {} is missing kindOptions.entrypoint",
                        task.slug
                    ))
                })?;
            let query_path = resolve_relative(task.entrypoint.as_deref(), &query_file);
            let query = fs.read_to_string(&query_path)?;
            request.insert("query".to_string(), Value::String(query));
            request.insert("queryArgs".to_string(), Value::Object(param_values.clone()));
            StdApiRequest::new(
                FunctionSpecification {
                    namespace: "sql".into(),
                    name: "query".into(),
                },
                request,
            )
        }
        TaskKind::Rest => StdApiRequest::new(
            FunctionSpecification {
                namespace: "rest".into(),
                name: "request".into(),
            },
            task.kind_options.clone(),
        ),
        TaskKind::Builtin => StdApiRequest::new(
            function_specification_from_kind_options(&task.kind_options)?,
            param_values.clone(),
        ),
        _ => return Ok(None),
    };
    debug!(task = %task.slug, builtin = %request.slug(), "task runs as builtin");
    Ok(Some(request))
}

/// `file` relative to the directory of the task's defining file.
fn resolve_relative(task_file: Option<&Path>, file: &str) -> PathBuf {
    let file = Path::new(file);
    if file.is_absolute() {
        return file.to_path_buf();
    }
    match task_file.and_then(Path::parent) {
        Some(dir) => dir.join(file),
        None => file.to_path_buf(),
    }
}

/// Runs builtin requests through the local builtins binary.
#[derive(Debug, Clone)]
pub struct BuiltinClient {
    binary_path: PathBuf,
}

impl BuiltinClient {
    pub fn new(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Use `configured`, or `AIRDEV_BUILTINS_PATH` when it is unset. The
    /// binary has to exist.
    pub fn locate(fs: &dyn FileSystem, configured: Option<&Path>) -> Result<Self> {
        let path = match configured {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(BUILTINS_PATH_ENV)
                .map(PathBuf::from)
                .ok_or_else(|| {
                    AirdevError::ResolutionError(format!(
                        "builtins binary not configured; pass --builtins or set {BUILTINS_PATH_ENV}"
                    ))
                })?,
        };

        if !fs.is_file(&path) {
            return Err(AirdevError::ResolutionError(format!(
                "builtins binary not found at {}",
                path.display()
            )));
        }
        Ok(Self::new(path))
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// The argv that executes `request`.
    pub fn command(&self, request: &StdApiRequest) -> Result<Vec<String>> {
        Ok(vec![
            self.binary_path.to_string_lossy().into_owned(),
            serde_json::to_string(request)?,
        ])
    }
}
