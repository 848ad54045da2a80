// src/exec/collector.rs

use std::fmt;

use serde_json::Value;
use tracing::{error, info};

use crate::logs::{LogBroker, LogItem, scan_for_errors};
use crate::outputs::{ChunkBuffer, ParseOptions, apply_output_command, parse_line};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStream::Stdout => f.write_str("stdout"),
            OutputStream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Single owner of a run's output document.
///
/// Lines from both streams are fed here in arrival order, so the document
/// and the chunk buffer need no locking.
#[derive(Debug)]
pub struct OutputCollector {
    run_id: String,
    task_slug: String,
    document: Value,
    chunks: ChunkBuffer,
    options: ParseOptions,
    next_insert_id: u64,
    broker: LogBroker,
}

impl OutputCollector {
    pub fn new(
        run_id: impl Into<String>,
        task_slug: impl Into<String>,
        broker: LogBroker,
        options: ParseOptions,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            task_slug: task_slug.into(),
            document: Value::Null,
            chunks: ChunkBuffer::new(),
            options,
            next_insert_id: 0,
            broker,
        }
    }

    /// Interpret one line and record it to the run log.
    ///
    /// Malformed output commands are logged and otherwise ignored.
    pub fn handle_line(&mut self, stream: OutputStream, line: &str) {
        scan_for_errors(&self.task_slug, line);

        match parse_line(&mut self.chunks, line, &self.options) {
            Ok(Some(parsed)) => {
                if let Err(err) = apply_output_command(parsed, &mut self.document) {
                    error!(
                        run_id = %self.run_id,
                        task = %self.task_slug,
                        error = %err,
                        "outputs: failed to apply output command"
                    );
                }
            }
            Ok(None) => {}
            Err(err) => {
                error!(
                    run_id = %self.run_id,
                    task = %self.task_slug,
                    error = %err,
                    "outputs: invalid output command"
                );
            }
        }

        info!(task = %self.task_slug, %stream, "{}", line);

        let insert_id = self.next_insert_id;
        self.next_insert_id += 1;
        self.broker
            .record(LogItem::new(insert_id, line, self.task_slug.clone()));
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn into_document(self) -> Value {
        self.document
    }
}
