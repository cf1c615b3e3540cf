//! Dotted/bracketed path lookup into nested maps and sequences.
//!
//! `a.b.0`, `a.b[0]`, `a["b"][0]` and `a['b'].0` all address the same node.
//! Numeric segments index sequences; every segment is a key for maps.

use crate::error::{Error, Result, kind_of};
use serde_json::Value;

/// One step of a path, remembering how it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    /// Normalized key (brackets and quotes stripped).
    pub key: String,
    /// Source text of the step including its leading `.` or brackets.
    pub raw: &'a str,
}

/// Split a path into segments. Empty steps (`a..b`) are skipped.
pub fn segments(path: &str) -> Vec<Segment<'_>> {
    let bytes = path.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        if bytes[i] == b'[' {
            let (inner, end) = match path[i..].find(']') {
                Some(off) => (&path[i + 1..i + off], i + off + 1),
                None => (&path[i + 1..], bytes.len()),
            };
            let key = inner
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .to_string();
            out.push(Segment {
                key,
                raw: &path[start..end],
            });
            i = end;
            continue;
        }
        if bytes[i] == b'.' {
            i += 1;
        }
        let key_start = i;
        while i < bytes.len() && bytes[i] != b'.' && bytes[i] != b'[' {
            i += 1;
        }
        if i > key_start {
            out.push(Segment {
                key: path[key_start..i].to_string(),
                raw: &path[start..i],
            });
        }
    }
    out
}

/// Look one step into `value`.
pub fn child<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    }
}

/// Resolve `path` against `root`.
pub fn get<'v>(root: &'v Value, path: &str) -> Result<&'v Value> {
    let mut current = root;
    for segment in segments(path) {
        current = match current {
            Value::Object(map) => map
                .get(&segment.key)
                .ok_or_else(|| Error::path(path, format!("missing key {:?}", segment.key)))?,
            Value::Array(items) => {
                let idx: usize = segment.key.parse().map_err(|_| {
                    Error::path(path, format!("{:?} is not a sequence index", segment.key))
                })?;
                items.get(idx).ok_or_else(|| {
                    Error::path(
                        path,
                        format!("index {} out of range for length {}", idx, items.len()),
                    )
                })?
            }
            other => {
                return Err(Error::path(
                    path,
                    format!("cannot step into {} with {:?}", kind_of(other), segment.key),
                ));
            }
        };
    }
    Ok(current)
}

/// Follow as many leading segments as exist under `root`.
///
/// Returns how many segments were consumed and the value reached; the
/// remaining segments are left to the caller (e.g. as trailing accessors
/// in an expression).
pub fn longest_prefix<'v>(root: &'v Value, segments: &[Segment<'_>]) -> (usize, &'v Value) {
    let mut current = root;
    let mut consumed = 0;
    for segment in segments {
        match child(current, &segment.key) {
            Some(next) => {
                current = next;
                consumed += 1;
            }
            None => break,
        }
    }
    (consumed, current)
}
