// src/handlers/logs.rs

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::HandlerResult;
use super::runs::get_run;
use crate::errors::Result;
use crate::logs::LogItem;
use crate::state::ServerState;

/// Stream a run's log to `flush`: first the recorded history, then live
/// lines, until the run's log is closed or `cancel` fires (client gone).
///
/// An error from `flush` ends the stream with that error.
pub async fn stream_logs<F>(
    state: &ServerState,
    run_id: &str,
    cancel: &CancellationToken,
    mut flush: F,
) -> HandlerResult<()>
where
    F: FnMut(&LogItem) -> Result<()>,
{
    let run = get_run(state, run_id)?;
    let mut watcher = run.log_broker.new_watcher();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(run_id, "log stream cancelled by client");
                return Ok(());
            }
            item = watcher.recv() => match item {
                Some(item) => flush(&item)?,
                None => return Ok(()),
            },
        }
    }
}

/// One server-sent event carrying a log item.
pub fn sse_event(item: &LogItem) -> Result<String> {
    Ok(format!("data: {}\n\n", serde_json::to_string(item)?))
}
