// src/outputs/mod.rs

//! Output protocol interpreter.
//!
//! Task processes emit structured output by printing marker lines on stdout
//! or stderr. This module turns those lines into commands and applies them to
//! a run-scoped JSON document.
//!
//! - [`path`] parses the JS-style paths used by `set`/`append` commands.
//! - [`parse`] recognises the line grammars and reassembles chunked lines.
//! - [`apply`] mutates the output document.

pub mod apply;
pub mod parse;
pub mod path;

use thiserror::Error;

pub use apply::apply_output_command;
pub use parse::{parse_line, ChunkBuffer, OutputCommand, ParseOptions, ParsedLine};
pub use path::{JsPath, PathComponent};

/// Errors produced while parsing or applying an output command.
///
/// Every variant is local to a single line: callers log it and keep
/// scanning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("expected object")]
    ExpectedObject,

    #[error("expected array")]
    ExpectedArray,

    #[error("array had too few elements (index {index}, len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("expected array at append point")]
    ExpectedArrayAtAppendPoint,

    #[error("expected json object at top level")]
    ExpectedObjectAtRoot,

    #[error("output line too long")]
    LineTooLong,

    #[error("line started with airplane_chunk but was not a valid chunk: {0}")]
    InvalidChunk(String),

    #[error("line does not match any known airplane_output format ({0})")]
    UnknownFormat(String),
}
