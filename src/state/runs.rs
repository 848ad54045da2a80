// src/state/runs.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use tracing::debug;

use super::run::LocalRun;
use crate::errors::{AirdevError, Result};

type RunSlot = Arc<Mutex<LocalRun>>;

/// Registry of local runs.
///
/// The run map is only write-locked to insert a new run; each run sits behind
/// its own lock, so updates to different runs do not contend. History and
/// descendant indexes have their own lock.
#[derive(Debug, Default)]
pub struct RunStore {
    runs: RwLock<HashMap<String, RunSlot>>,
    index: Mutex<RunIndex>,
}

#[derive(Debug, Default)]
struct RunIndex {
    /// Task key to run ids, most recent first.
    history: HashMap<String, Vec<String>>,
    /// Parent run id to child run ids, in creation order.
    descendants: HashMap<String, Vec<String>>,
}

fn lock_run(slot: &RunSlot) -> MutexGuard<'_, LocalRun> {
    slot.lock().unwrap_or_else(|p| p.into_inner())
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, run_id: &str) -> Option<RunSlot> {
        let runs = self.runs.read().unwrap_or_else(|p| p.into_inner());
        runs.get(run_id).cloned()
    }

    fn index(&self) -> MutexGuard<'_, RunIndex> {
        self.index.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register `run` under `run_id` and record it in the history of
    /// `task_key`. Adding an id twice replaces the run but keeps a single
    /// history entry.
    pub fn add(&self, task_key: &str, run_id: &str, mut run: LocalRun) -> LocalRun {
        run.run_id = run_id.to_string();
        let parent_id = run.parent_id.clone().filter(|p| !p.is_empty());
        let stored = run.clone();

        {
            let mut runs = self.runs.write().unwrap_or_else(|p| p.into_inner());
            runs.insert(run_id.to_string(), Arc::new(Mutex::new(run)));
        }

        self.index_run(task_key, run_id, parent_id.as_deref());
        debug!(run_id, task = task_key, "registered run");
        stored
    }

    /// Move `run_id` to the front of the history of `task_key` and record it
    /// as a child of `parent_id`. Used for runs that were registered before
    /// their task or parent was known.
    pub fn index_run(&self, task_key: &str, run_id: &str, parent_id: Option<&str>) {
        let mut index = self.index();
        let history = index.history.entry(task_key.to_string()).or_default();
        history.retain(|id| id != run_id);
        history.insert(0, run_id.to_string());

        if let Some(parent_id) = parent_id.filter(|p| !p.is_empty()) {
            let children = index.descendants.entry(parent_id.to_string()).or_default();
            if !children.iter().any(|id| id == run_id) {
                children.push(run_id.to_string());
            }
        }
    }

    pub fn get(&self, run_id: &str) -> Option<LocalRun> {
        let slot = self.slot(run_id)?;
        let run = lock_run(&slot).clone();
        Some(run)
    }

    /// Apply `f` to the run atomically and return the updated copy.
    ///
    /// If `f` fails, the run is left as it was.
    pub fn update<F>(&self, run_id: &str, f: F) -> Result<LocalRun>
    where
        F: FnOnce(&mut LocalRun) -> Result<()>,
    {
        let slot = self
            .slot(run_id)
            .ok_or_else(|| AirdevError::RunNotFound(run_id.to_string()))?;
        let mut run = lock_run(&slot);

        let mut updated = run.clone();
        f(&mut updated)?;
        *run = updated.clone();
        Ok(updated)
    }

    /// Runs for `task_key`, most recent first.
    pub fn history(&self, task_key: &str) -> Vec<LocalRun> {
        let ids = self
            .index()
            .history
            .get(task_key)
            .cloned()
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Child runs started with `run_id` as their parent.
    pub fn descendants(&self, run_id: &str) -> Vec<LocalRun> {
        let ids = self
            .index()
            .descendants
            .get(run_id)
            .cloned()
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.runs.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
