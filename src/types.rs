// src/types.rs

//! Records shared across the executor, the run registry and the handlers.
//!
//! Task and view configs are produced by discovery, which lives outside this
//! crate; here they are plain data.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter values keyed by parameter slug, in insertion order.
pub type Values = Map<String, Value>;

/// Runtime type of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Shell,
    Python,
    Node,
    Sql,
    Rest,
    Image,
    Builtin,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Shell => "shell",
            TaskKind::Python => "python",
            TaskKind::Node => "node",
            TaskKind::Sql => "sql",
            TaskKind::Rest => "rest",
            TaskKind::Image => "image",
            TaskKind::Builtin => "builtin",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shell" => Ok(TaskKind::Shell),
            "python" => Ok(TaskKind::Python),
            "node" => Ok(TaskKind::Node),
            "sql" => Ok(TaskKind::Sql),
            "rest" => Ok(TaskKind::Rest),
            "image" | "docker" => Ok(TaskKind::Image),
            "builtin" => Ok(TaskKind::Builtin),
            other => Err(format!("unknown task kind: {other}")),
        }
    }
}

/// A declared environment variable: either a literal or a reference to a
/// named config variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnvVarValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

impl EnvVarValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            config: None,
        }
    }

    pub fn from_config(name: impl Into<String>) -> Self {
        Self {
            value: None,
            config: Some(name.into()),
        }
    }
}

/// A declared task parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

fn default_param_type() -> String {
    "shorttext".to_string()
}

/// An external resource (database, API, ...) a run can be attached to.
///
/// Only `id`, `slug` and `kind` are interpreted here; kind-specific fields
/// are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub slug: String,
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A task as produced by discovery.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskConfig {
    pub slug: String,
    pub name: String,
    pub kind: TaskKind,
    pub kind_options: Values,
    /// Absolute path to the file that runs; `None` for kinds without one.
    pub entrypoint: Option<PathBuf>,
    pub parameters: Vec<Parameter>,
    pub env_vars: BTreeMap<String, EnvVarValue>,
    /// Resource attachments: alias to resource slug.
    pub resources: BTreeMap<String, String>,
}

/// A view as produced by discovery.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewConfig {
    pub slug: String,
    pub name: String,
    pub entrypoint: Option<PathBuf>,
    pub env_vars: BTreeMap<String, EnvVarValue>,
}
