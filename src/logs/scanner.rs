// src/logs/scanner.rs

//! Best-effort detection of well-known failure signatures in run logs.
//!
//! Matches are informational only: they produce a hint on the server log and
//! never change the outcome of a run.

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

const NODE_ESM_MARKER: &str = "Error [ERR_REQUIRE_ESM]";

static NODE_MODULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/node_modules/((?:@[^/\s]+/)?[^/\s]+)/").expect("node module pattern is valid")
});

/// Detect a Node.js `ERR_REQUIRE_ESM` failure.
///
/// Returns the offending module name when it can be extracted from the
/// message, an empty string for unrecognised message formats, and `None`
/// when the line is not an ESM error at all.
pub fn scan_for_error_node_esm(line: &str) -> Option<String> {
    if !line.contains(NODE_ESM_MARKER) {
        return None;
    }

    let module = NODE_MODULE_RE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();
    Some(module)
}

/// Run every known scanner over `line` and log a hint for matches.
pub fn scan_for_errors(task_slug: &str, line: &str) {
    if let Some(module) = scan_for_error_node_esm(line) {
        if module.is_empty() {
            warn!(
                task = %task_slug,
                "task failed to require an ES module; convert the import or pin a CommonJS release"
            );
        } else {
            warn!(
                task = %task_slug,
                module = %module,
                "task failed to require ES module '{module}'; pin a CommonJS release or bundle it"
            );
        }
    }
}
