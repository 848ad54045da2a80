// src/state/run.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::builtins::StdApiRequest;
use crate::logs::LogBroker;
use crate::types::{Parameter, TaskKind, Values};

/// Lifecycle of a run: `Queued -> Active -> {Succeeded | Failed | Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum RunStatus {
    #[default]
    Queued,
    Active,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Succeeded | RunStatus::Failed | RunStatus::Cancelled
        )
    }
}

/// `run` followed by a v4 UUID in simple form.
pub fn generate_run_id() -> String {
    format!("run{}", Uuid::new_v4().simple())
}

/// One execution attempt of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRun {
    pub id: String,
    #[serde(rename = "runID")]
    pub run_id: String,
    pub status: RunStatus,
    pub outputs: Value,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "creatorID")]
    pub creator_id: String,
    pub succeeded_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub param_values: Values,
    pub parameters: Vec<Parameter>,
    #[serde(rename = "parentID")]
    pub parent_id: Option<String>,
    #[serde(rename = "taskID")]
    pub task_id: String,
    pub task_name: String,
    pub kind: Option<TaskKind>,
    /// Attached resources: alias to resource id.
    pub resources: BTreeMap<String, String>,
    #[serde(rename = "isStdAPI")]
    pub is_std_api: bool,
    #[serde(rename = "stdAPIRequest")]
    pub std_api_request: Option<StdApiRequest>,
    pub env_slug: String,

    #[serde(skip)]
    pub log_broker: LogBroker,
    #[serde(skip)]
    pub cancel: CancellationToken,
    /// Set for runs that executed on the remote platform.
    #[serde(skip)]
    pub remote: bool,
}

impl LocalRun {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            run_id: id.clone(),
            id,
            status: RunStatus::Queued,
            outputs: Value::Null,
            created_at: Utc::now(),
            creator_id: String::new(),
            succeeded_at: None,
            failed_at: None,
            cancelled_at: None,
            cancelled_by: None,
            param_values: Values::new(),
            parameters: Vec::new(),
            parent_id: None,
            task_id: String::new(),
            task_name: String::new(),
            kind: None,
            resources: BTreeMap::new(),
            is_std_api: false,
            std_api_request: None,
            env_slug: String::new(),
            log_broker: LogBroker::new(),
            cancel: CancellationToken::new(),
            remote: false,
        }
    }

    /// Move to `status`, stamping the matching timestamp.
    ///
    /// Transitions out of a terminal state and back to `Queued` are ignored;
    /// the return value says whether the run changed.
    pub fn transition(&mut self, status: RunStatus) -> bool {
        if self.status.is_terminal() || status == RunStatus::Queued {
            return false;
        }

        let now = Utc::now();
        match status {
            RunStatus::Succeeded => self.succeeded_at = Some(now),
            RunStatus::Failed => self.failed_at = Some(now),
            RunStatus::Cancelled => self.cancelled_at = Some(now),
            RunStatus::Queued | RunStatus::Active => {}
        }
        self.status = status;
        true
    }
}
