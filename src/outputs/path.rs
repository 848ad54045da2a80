// src/outputs/path.rs

//! JS-style paths into a JSON document.
//!
//! Accepted forms:
//!
//! ```text
//! a.b.c[5][4]["asdf"]["\"]"]
//! [""]
//! ['single quoted']
//! ```
//!
//! A path is a leading identifier or bracket, followed by any number of
//! `.ident`, `[index]` or `["key"]` components. The empty string is the
//! empty path (the document root).

use std::fmt;
use std::str::FromStr;

use super::OutputError;

/// One step of a [`JsPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathComponent {
    /// Object member access.
    Key(String),
    /// Array element access. Never auto-grows the array.
    Index(usize),
}

/// A parsed path. An empty path addresses the root of the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct JsPath {
    components: Vec<PathComponent>,
}

impl JsPath {
    pub fn new(components: Vec<PathComponent>) -> Self {
        Self { components }
    }

    /// Parse a complete path. Trailing text is an error.
    pub fn parse(s: &str) -> Result<Self, OutputError> {
        let (path, consumed) = Self::parse_partial(s)?;
        if consumed != s.len() {
            return Err(invalid(s, format!("unexpected character at offset {consumed}")));
        }
        Ok(path)
    }

    /// Parse the longest path prefix of `s`.
    ///
    /// Returns the path and the number of bytes consumed. Parsing stops at
    /// the first character that cannot continue a path (typically the space
    /// separating the path from a value). A malformed component is an error.
    pub fn parse_partial(s: &str) -> Result<(Self, usize), OutputError> {
        let mut components = Vec::new();
        let mut pos = 0;

        loop {
            let rest = &s[pos..];
            match rest.chars().next() {
                Some('[') => {
                    let (component, used) = parse_bracket(s, pos)?;
                    components.push(component);
                    pos += used;
                }
                Some('.') if !components.is_empty() => {
                    let ident = take_ident(&rest[1..]);
                    if ident.is_empty() {
                        return Err(invalid(s, format!("empty key after '.' at offset {pos}")));
                    }
                    components.push(PathComponent::Key(ident.to_string()));
                    pos += 1 + ident.len();
                }
                Some(c) if components.is_empty() && is_ident_char(c) => {
                    let ident = take_ident(rest);
                    components.push(PathComponent::Key(ident.to_string()));
                    pos += ident.len();
                }
                _ => break,
            }
        }

        Ok((Self { components }, pos))
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl FromStr for JsPath {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsPath::parse(s)
    }
}

impl fmt::Display for JsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            match component {
                PathComponent::Key(key) if is_plain_ident(key) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(key)?;
                }
                PathComponent::Key(key) => {
                    let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "[{quoted}]")?;
                }
                PathComponent::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn invalid(path: &str, reason: String) -> OutputError {
    OutputError::InvalidPath {
        path: path.to_string(),
        reason,
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_plain_ident(key: &str) -> bool {
    !key.is_empty() && key.chars().all(is_ident_char)
}

fn take_ident(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|&(_, c)| !is_ident_char(c))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}

/// Parse a `[...]` component starting at `start` (which must be `[`).
/// Returns the component and the number of bytes consumed, including both
/// brackets.
fn parse_bracket(full: &str, start: usize) -> Result<(PathComponent, usize), OutputError> {
    let s = &full[start..];
    let bytes = s.as_bytes();

    let (component, close) = match bytes.get(1) {
        Some(b'"') => {
            let end = find_closing_quote(bytes, 2, b'"')
                .ok_or_else(|| invalid(full, "unterminated string key".to_string()))?;
            let key: String = serde_json::from_str(&s[1..=end])
                .map_err(|e| invalid(full, format!("bad string key: {e}")))?;
            (PathComponent::Key(key), end + 1)
        }
        Some(b'\'') => {
            let end = find_closing_quote(bytes, 2, b'\'')
                .ok_or_else(|| invalid(full, "unterminated string key".to_string()))?;
            let key = unescape_single_quoted(&s[2..end]);
            (PathComponent::Key(key), end + 1)
        }
        Some(b) if b.is_ascii_digit() => {
            let digits = bytes[1..].iter().take_while(|b| b.is_ascii_digit()).count();
            let index: usize = s[1..1 + digits]
                .parse()
                .map_err(|e| invalid(full, format!("bad index: {e}")))?;
            (PathComponent::Index(index), 1 + digits)
        }
        _ => {
            return Err(invalid(
                full,
                format!("expected index or quoted key after '[' at offset {start}"),
            ));
        }
    };

    if bytes.get(close) != Some(&b']') {
        return Err(invalid(full, format!("expected ']' at offset {}", start + close)));
    }
    Ok((component, close + 1))
}

/// Index of the closing `quote`, skipping backslash escapes.
fn find_closing_quote(bytes: &[u8], from: usize, quote: u8) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn unescape_single_quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
