// src/exec/mod.rs

//! Local task execution.
//!
//! - [`config`] is the per-run input of an executor.
//! - [`expressions`] interpolates templates through the remote API.
//! - [`collector`] owns a run's output document and feeds its log.
//! - [`local`] spawns the task process and streams its output.
//! - [`backend`] provides the `Executor` trait the handlers call, which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod collector;
pub mod config;
pub mod expressions;
pub mod local;

pub use backend::{Executor, RunOutcome};
pub use collector::{OutputCollector, OutputStream};
pub use config::LocalRunConfig;
pub use local::LocalExecutor;
