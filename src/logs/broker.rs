// src/logs/broker.rs

//! Per-run log broadcaster.
//!
//! A [`LogBroker`] keeps the full history of a run's log lines and pushes
//! every new line to all registered [`LogWatcher`]s. A watcher first
//! receives the history recorded before it was registered, exactly once,
//! the first time anything is delivered to it (via `record` or `close`).
//! The `flushed` flag that guards this replay lives under the same lock as
//! the watcher map, so replay and live pushes cannot interleave.
//!
//! Delivery queues are unbounded: `record` never blocks on a slow
//! subscriber.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::debug;

use super::LogItem;

/// Cloneable handle to one run's log broadcaster.
#[derive(Debug, Clone, Default)]
pub struct LogBroker {
    shared: Arc<Mutex<BrokerState>>,
}

#[derive(Debug, Default)]
struct BrokerState {
    watchers: HashMap<u64, WatcherSlot>,
    logs: Vec<LogItem>,
    closed: bool,
    next_watcher_id: u64,
}

#[derive(Debug)]
struct WatcherSlot {
    tx: mpsc::UnboundedSender<LogItem>,
    flushed: bool,
}

impl WatcherSlot {
    /// Push the history once, then `item` if given. Returns `false` when
    /// the receiving side is gone.
    fn deliver(&mut self, history: &[LogItem], item: Option<&LogItem>) -> bool {
        if !self.flushed {
            self.flushed = true;
            for past in history {
                if self.tx.send(past.clone()).is_err() {
                    return false;
                }
            }
        }
        match item {
            Some(item) => self.tx.send(item.clone()).is_ok(),
            None => true,
        }
    }
}

impl LogBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a broker that already holds `history`, e.g. for a run whose
    /// logs were produced elsewhere.
    pub fn with_history(history: Vec<LogItem>) -> Self {
        let broker = Self::new();
        broker.lock().logs = history;
        broker
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append `item` to the history and push it to every registered watcher.
    ///
    /// Recording after [`close`](Self::close) is a no-op.
    pub fn record(&self, item: LogItem) {
        let mut state = self.lock();
        if state.closed {
            debug!(insert_id = item.insert_id, "dropping log recorded after close");
            return;
        }

        let BrokerState { watchers, logs, .. } = &mut *state;
        watchers.retain(|_, slot| slot.deliver(logs, Some(&item)));
        logs.push(item);
    }

    /// Mark the broker closed, flush history to watchers that never received
    /// it, and close every delivery queue.
    pub fn close(&self) {
        let mut state = self.lock();
        let BrokerState { watchers, logs, .. } = &mut *state;
        for (_, mut slot) in watchers.drain() {
            slot.deliver(logs, None);
        }
        state.closed = true;
    }

    /// Register a new subscriber.
    ///
    /// On a closed broker the watcher receives the full history followed by
    /// end-of-stream; this never blocks.
    pub fn new_watcher(&self) -> LogWatcher {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.lock();
        let id = state.next_watcher_id;
        state.next_watcher_id += 1;

        let mut slot = WatcherSlot { tx, flushed: false };
        if state.closed {
            slot.deliver(&state.logs, None);
        } else {
            state.watchers.insert(id, slot);
        }

        LogWatcher {
            id,
            rx,
            broker: self.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Snapshot of everything recorded so far.
    pub fn history(&self) -> Vec<LogItem> {
        self.lock().logs.clone()
    }

    pub fn watcher_count(&self) -> usize {
        self.lock().watchers.len()
    }

    fn unregister(&self, id: u64) {
        self.lock().watchers.remove(&id);
    }
}

/// Receiving side of a subscription. Dropping it unregisters the watcher.
#[derive(Debug)]
pub struct LogWatcher {
    id: u64,
    rx: mpsc::UnboundedReceiver<LogItem>,
    broker: LogBroker,
}

impl LogWatcher {
    /// Next log line, or `None` once the broker has closed this watcher's
    /// queue and everything has been drained.
    pub async fn recv(&mut self) -> Option<LogItem> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv).
    pub fn try_recv(&mut self) -> Option<LogItem> {
        self.rx.try_recv().ok()
    }
}

impl Drop for LogWatcher {
    fn drop(&mut self) {
        self.broker.unregister(self.id);
    }
}
