// src/outputs/parse.rs

//! Line grammar for output commands.
//!
//! Two grammars are recognised on the *effective* text of a line (after
//! chunk reassembly):
//!
//! - legacy: `airplane_output[:NAME] VALUE` appends VALUE to the array at
//!   top-level key NAME (default `output`). VALUE is JSON if it parses,
//!   otherwise the trimmed text.
//! - structured: `airplane_output_set[:PATH] VALUE` and
//!   `airplane_output_append[:PATH] VALUE`, where VALUE must be JSON.
//!
//! Long values can be split across `airplane_chunk:KEY TEXT` lines and closed
//! with `airplane_chunk_end:KEY`; see [`ChunkBuffer`].

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use super::path::JsPath;
use super::OutputError;

pub const OUTPUT_PREFIX: &str = "airplane_output";
pub const DEFAULT_OUTPUT_NAME: &str = "output";
pub const CHUNK_PREFIX: &str = "airplane_chunk";

static LEGACY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^airplane_output(?::(?:("[^"]*")|('[^']*')|([^ ]+))?)? (.*)$"#)
        .expect("legacy output pattern is valid")
});

static STRUCTURED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^airplane_output(_set|_append)(:| )(.*)$")
        .expect("structured output pattern is valid")
});

static CHUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^airplane_chunk(|_end):([^ ]*)(?: (.+)|)$").expect("chunk pattern is valid")
});

/// What a parsed line asks the interpreter to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputCommand {
    /// Append to the array at a named top-level key.
    Legacy { name: String },
    /// Replace the value at `path` (the whole document if empty).
    Set { path: JsPath },
    /// Append to the array at `path` (the document itself if empty).
    Append { path: JsPath },
}

/// One output command extracted from a line of process output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub command: OutputCommand,
    pub value: Value,
    /// Byte length of the effective line the command was read from.
    pub size: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Maximum size in bytes of an effective line (after chunk reassembly).
    /// `0` disables the limit.
    pub max_line_bytes: usize,
}

/// Partial chunked lines, keyed by chunk key.
///
/// Owned by a single run; both output streams of the run share it.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: HashMap<String, String>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunk keys still waiting for their `_end` line.
    pub fn pending(&self) -> usize {
        self.chunks.len()
    }

    /// Convert a raw line into its effective text.
    ///
    /// Non-chunk lines are returned unchanged. A chunk line is buffered and
    /// yields an empty string; the matching end line yields the
    /// concatenation of all buffered chunks for that key.
    pub fn effective_line(&mut self, text: &str) -> Result<String, OutputError> {
        if !text.starts_with(CHUNK_PREFIX) {
            return Ok(text.to_string());
        }

        let caps = CHUNK_RE
            .captures(text)
            .ok_or_else(|| OutputError::InvalidChunk(text.to_string()))?;
        let key = group(&caps, 2);

        if group(&caps, 1) == "_end" {
            return Ok(self.chunks.remove(key).unwrap_or_default());
        }

        self.chunks
            .entry(key.to_string())
            .or_default()
            .push_str(group(&caps, 3));
        Ok(String::new())
    }
}

/// Parse one raw line of process output.
///
/// Returns `Ok(None)` for lines that are not output commands (including
/// buffered chunk lines).
pub fn parse_line(
    chunks: &mut ChunkBuffer,
    text: &str,
    opts: &ParseOptions,
) -> Result<Option<ParsedLine>, OutputError> {
    let effective = chunks.effective_line(text)?;

    if opts.max_line_bytes > 0 && effective.len() > opts.max_line_bytes {
        return Err(OutputError::LineTooLong);
    }

    if !effective.starts_with(OUTPUT_PREFIX) {
        return Ok(None);
    }

    if let Some(line) = parse_legacy(&effective) {
        return Ok(Some(line));
    }

    match parse_structured(&effective) {
        Some(Ok(line)) => Ok(Some(line)),
        Some(Err(reason)) => Err(OutputError::UnknownFormat(reason)),
        // Bare marker lines such as `airplane_output` keep their historical
        // meaning: an empty string appended to the default output.
        None => Ok(Some(ParsedLine {
            command: OutputCommand::Legacy {
                name: DEFAULT_OUTPUT_NAME.to_string(),
            },
            value: Value::String(String::new()),
            size: effective.len(),
        })),
    }
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map(|m| m.as_str()).unwrap_or("")
}

fn parse_legacy(text: &str) -> Option<ParsedLine> {
    let caps = LEGACY_RE.captures(text)?;

    let quoted = if !group(&caps, 1).is_empty() {
        group(&caps, 1).trim_matches('"')
    } else if !group(&caps, 2).is_empty() {
        group(&caps, 2).trim_matches('\'')
    } else {
        group(&caps, 3)
    };
    let name = quoted.trim();
    let name = if name.is_empty() {
        DEFAULT_OUTPUT_NAME
    } else {
        name
    };

    let raw = group(&caps, 4).trim();
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));

    Some(ParsedLine {
        command: OutputCommand::Legacy {
            name: name.to_string(),
        },
        value,
        size: text.len(),
    })
}

/// `None` when the structured grammar does not apply at all; `Some(Err)`
/// when it applies but the line is malformed.
fn parse_structured(text: &str) -> Option<Result<ParsedLine, String>> {
    let caps = STRUCTURED_RE.captures(text)?;
    let rest = group(&caps, 3);

    let (path, raw_value) = if group(&caps, 2) == ":" {
        let (path, consumed) = match JsPath::parse_partial(rest) {
            Ok(parsed) => parsed,
            Err(err) => return Some(Err(err.to_string())),
        };
        if rest.as_bytes().get(consumed) != Some(&b' ') {
            return Some(Err("expected a space between path and value".to_string()));
        }
        (path, rest[consumed + 1..].trim())
    } else {
        (JsPath::default(), rest)
    };

    let value: Value = match serde_json::from_str(raw_value) {
        Ok(value) => value,
        Err(err) => return Some(Err(format!("value is not valid JSON: {err}"))),
    };

    let command = if group(&caps, 1) == "_set" {
        OutputCommand::Set { path }
    } else {
        OutputCommand::Append { path }
    };

    Some(Ok(ParsedLine {
        command,
        value,
        size: text.len(),
    }))
}
