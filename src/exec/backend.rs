// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! Handlers talk to an [`Executor`] instead of spawning processes
//! themselves. Production uses [`LocalExecutor`](super::LocalExecutor);
//! tests can provide an implementation that records configs and returns a
//! canned outcome without spawning anything.

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::config::LocalRunConfig;

/// How an execution ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Succeeded {
        outputs: Value,
    },
    Failed {
        outputs: Value,
        error: String,
    },
    Cancelled {
        outputs: Value,
    },
    /// The task cannot run locally; nothing was started.
    Skipped {
        reason: String,
    },
}

pub trait Executor: Send + Sync + Debug {
    /// Run one task to completion.
    ///
    /// Firing `cancel` stops the run; the outcome is then `Cancelled`.
    fn execute(
        &self,
        config: LocalRunConfig,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = RunOutcome> + Send + '_>>;
}
