// src/outputs/apply.rs

//! Apply parsed output commands to the output document.
//!
//! Each command is validated against the current document before anything
//! is written, so a failing command leaves the document untouched. Nulls
//! met along a path are materialised as empty objects when a key is looked
//! up in them; arrays never grow except through `append`.

use serde_json::{Map, Value};

use super::parse::{OutputCommand, ParsedLine};
use super::path::{JsPath, PathComponent};
use super::OutputError;

/// Apply one command to `doc`.
pub fn apply_output_command(line: ParsedLine, doc: &mut Value) -> Result<(), OutputError> {
    match line.command {
        OutputCommand::Legacy { name } => apply_legacy(&name, line.value, doc),
        OutputCommand::Set { path } => apply_set(&path, line.value, doc),
        OutputCommand::Append { path } => apply_append(&path, line.value, doc),
    }
}

/// Replace the value at `path`. An empty path replaces the whole document.
pub fn apply_set(path: &JsPath, value: Value, doc: &mut Value) -> Result<(), OutputError> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }

    check_path(path, doc)?;
    let slot = locate_mut(path, doc)?;
    *slot = value;
    Ok(())
}

/// Append to the array at `path`, creating it when the target is absent or
/// null. An empty path appends to the document itself.
pub fn apply_append(path: &JsPath, value: Value, doc: &mut Value) -> Result<(), OutputError> {
    match check_path(path, doc)? {
        None | Some(Value::Null) | Some(Value::Array(_)) => {}
        Some(_) => return Err(OutputError::ExpectedArrayAtAppendPoint),
    }

    let slot = locate_mut(path, doc)?;
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => {
            items.push(value);
            Ok(())
        }
        _ => Err(OutputError::ExpectedArrayAtAppendPoint),
    }
}

/// Append to the array at top-level key `name`.
pub fn apply_legacy(name: &str, value: Value, doc: &mut Value) -> Result<(), OutputError> {
    match doc {
        Value::Null => {}
        Value::Object(obj) => match obj.get(name) {
            None | Some(Value::Array(_)) => {}
            Some(_) => return Err(OutputError::ExpectedArray),
        },
        _ => return Err(OutputError::ExpectedObjectAtRoot),
    }

    if doc.is_null() {
        *doc = Value::Object(Map::new());
    }
    let Value::Object(obj) = doc else {
        return Err(OutputError::ExpectedObjectAtRoot);
    };
    match obj
        .entry(name.to_string())
        .or_insert_with(|| Value::Array(Vec::new()))
    {
        Value::Array(items) => {
            items.push(value);
            Ok(())
        }
        _ => Err(OutputError::ExpectedArray),
    }
}

/// Walk `path` without mutating and report the current target, or `None`
/// when the target does not exist yet (absent key or a null that will be
/// materialised).
fn check_path<'a>(path: &JsPath, doc: &'a Value) -> Result<Option<&'a Value>, OutputError> {
    let mut cur = Some(doc);

    for component in path.components() {
        cur = match component {
            PathComponent::Key(key) => match cur {
                None | Some(Value::Null) => None,
                Some(Value::Object(obj)) => obj.get(key),
                Some(_) => return Err(OutputError::ExpectedObject),
            },
            PathComponent::Index(index) => match cur {
                Some(Value::Array(items)) => match items.get(*index) {
                    Some(item) => Some(item),
                    None => {
                        return Err(OutputError::IndexOutOfRange {
                            index: *index,
                            len: items.len(),
                        });
                    }
                },
                _ => return Err(OutputError::ExpectedArray),
            },
        };
    }

    Ok(cur)
}

/// Walk `path`, materialising objects in place of nulls and inserting
/// missing keys as null.
fn locate_mut<'a>(path: &JsPath, doc: &'a mut Value) -> Result<&'a mut Value, OutputError> {
    let mut cur = doc;

    for component in path.components() {
        cur = match component {
            PathComponent::Key(key) => {
                if cur.is_null() {
                    *cur = Value::Object(Map::new());
                }
                match cur {
                    Value::Object(obj) => obj.entry(key.clone()).or_insert(Value::Null),
                    _ => return Err(OutputError::ExpectedObject),
                }
            }
            PathComponent::Index(index) => match cur {
                Value::Array(items) => {
                    let len = items.len();
                    items
                        .get_mut(*index)
                        .ok_or(OutputError::IndexOutOfRange { index: *index, len })?
                }
                _ => return Err(OutputError::ExpectedArray),
            },
        };
    }

    Ok(cur)
}
