use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use airdev::exec::{Executor, LocalRunConfig, RunOutcome};
use airdev::logs::LogItem;

/// A fake executor that:
/// - records the config of every run it is given
/// - writes one log line per run
/// - returns a canned outcome, or waits for cancellation
#[derive(Debug)]
pub struct RecordingExecutor {
    outcome: RunOutcome,
    wait_for_cancel: bool,
    configs: Arc<Mutex<Vec<LocalRunConfig>>>,
    started: Arc<Notify>,
}

impl RecordingExecutor {
    pub fn new(outcome: RunOutcome) -> Self {
        Self {
            outcome,
            wait_for_cancel: false,
            configs: Arc::new(Mutex::new(Vec::new())),
            started: Arc::new(Notify::new()),
        }
    }

    pub fn succeeding(outputs: Value) -> Self {
        Self::new(RunOutcome::Succeeded { outputs })
    }

    /// Runs block until their cancellation token fires.
    pub fn until_cancelled() -> Self {
        let mut executor = Self::new(RunOutcome::Cancelled {
            outputs: Value::Null,
        });
        executor.wait_for_cancel = true;
        executor
    }

    pub fn configs(&self) -> Vec<LocalRunConfig> {
        self.configs.lock().unwrap().clone()
    }

    /// Notified each time a run starts.
    pub fn started(&self) -> Arc<Notify> {
        self.started.clone()
    }
}

impl Executor for RecordingExecutor {
    fn execute(
        &self,
        config: LocalRunConfig,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = RunOutcome> + Send + '_>> {
        Box::pin(async move {
            config.started.notify_one();
            // Let the caller observe the start before anything else happens.
            tokio::task::yield_now().await;
            config
                .log_broker
                .record(LogItem::new(0, format!("running {}", config.slug), &config.slug));
            self.configs.lock().unwrap().push(config);
            self.started.notify_one();

            if self.wait_for_cancel {
                cancel.cancelled().await;
                return RunOutcome::Cancelled {
                    outputs: Value::Null,
                };
            }
            self.outcome.clone()
        })
    }
}
