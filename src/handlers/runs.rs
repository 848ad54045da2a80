// src/handlers/runs.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{ApiError, HandlerResult};
use crate::errors::AirdevError;
use crate::state::{LocalRun, RunStatus, ServerState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOutputsResponse {
    pub output: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRunsResponse {
    pub runs: Vec<LocalRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDescendantsResponse {
    pub descendants: Vec<LocalRun>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRunRequest {
    #[serde(rename = "runID")]
    pub run_id: String,
    #[serde(default)]
    pub cancelled_by: Option<String>,
}

fn run_not_found(run_id: &str) -> ApiError {
    AirdevError::RunNotFound(run_id.to_string()).into()
}

pub fn get_run(state: &ServerState, run_id: &str) -> HandlerResult<LocalRun> {
    state.runs.get(run_id).ok_or_else(|| run_not_found(run_id))
}

pub fn get_outputs(state: &ServerState, run_id: &str) -> HandlerResult<GetOutputsResponse> {
    let run = get_run(state, run_id)?;
    Ok(GetOutputsResponse {
        output: run.outputs,
    })
}

/// Runs of a task, most recent first.
pub fn list_runs(state: &ServerState, task_slug: &str) -> ListRunsResponse {
    ListRunsResponse {
        runs: state.runs.history(task_slug),
    }
}

pub fn get_descendants(state: &ServerState, run_id: &str) -> HandlerResult<ListDescendantsResponse> {
    get_run(state, run_id)?;
    Ok(ListDescendantsResponse {
        descendants: state.runs.descendants(run_id),
    })
}

/// Request cancellation of a run.
///
/// A queued run is cancelled on the spot. An active run keeps its status
/// until its executor has stopped the process. Finished runs are returned
/// unchanged.
pub fn cancel_run(state: &ServerState, req: CancelRunRequest) -> HandlerResult<LocalRun> {
    let cancelled_by = req
        .cancelled_by
        .filter(|by| !by.is_empty())
        .or_else(|| state.settings.auth_info.user.as_ref().map(|u| u.id.clone()));

    let run = state.runs.update(&req.run_id, |run| {
        if run.status.is_terminal() {
            return Ok(());
        }
        run.cancelled_by = cancelled_by;
        if run.status == RunStatus::Queued {
            run.transition(RunStatus::Cancelled);
            run.log_broker.close();
        }
        run.cancel.cancel();
        Ok(())
    })?;

    info!(run_id = %run.id, status = ?run.status, "cancel requested");
    Ok(run)
}
