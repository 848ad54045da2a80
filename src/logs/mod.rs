// src/logs/mod.rs

//! Run log fan-out.
//!
//! - [`broker`] owns a run's log history and its live subscribers.
//! - [`scanner`] recognises well-known failure signatures in log lines.

pub mod broker;
pub mod scanner;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use broker::{LogBroker, LogWatcher};
pub use scanner::{scan_for_error_node_esm, scan_for_errors};

/// Severity of a run log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Debug,
}

/// One line of run output as delivered to log subscribers.
///
/// Ordering key is `(timestamp, insert_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogItem {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "insertID")]
    pub insert_id: u64,
    pub text: String,
    pub level: LogLevel,
    pub task_slug: String,
}

impl LogItem {
    pub fn new(insert_id: u64, text: impl Into<String>, task_slug: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            insert_id,
            text: text.into(),
            level: LogLevel::Info,
            task_slug: task_slug.into(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }
}
