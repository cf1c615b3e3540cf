//! `$from`: inherit a map from elsewhere in the config and override parts of it.

use super::{FROM, string_arg};
use crate::config::Depth;
use crate::error::{Error, Result, kind_of};
use crate::tree::{Expanded, Step, Transform, expand, path};
use serde_json::{Map, Value};
use tracing::trace;

/// Resolves `$from` against the original, unexpanded config.
#[derive(Debug, Clone, Copy)]
pub struct Inherit<'a> {
    context: &'a Value,
}

impl<'a> Inherit<'a> {
    pub fn new(context: &'a Value) -> Self {
        Self { context }
    }

    fn resolve(&self, value: &Value, depth: Depth) -> Result<Value> {
        match expand(value, self, depth)? {
            Expanded::Single(value) => Ok(value),
            // Inherit never splits.
            Expanded::Versions(versions) => Ok(versions.into_iter().next().unwrap_or(Value::Null)),
        }
    }
}

impl Transform for Inherit<'_> {
    fn apply(&self, node: &Value, depth: Depth) -> Result<Step> {
        let Some(map) = node.as_object() else {
            return Ok(Step::Keep);
        };
        let Some(arg) = map.get(FROM) else {
            return Ok(Step::Keep);
        };
        let path = string_arg(FROM, arg)?;
        let depth = depth.descend()?;
        trace!(path, "resolving $from");

        let target = self.resolve(path::get(self.context, path)?, depth)?;
        let mut merged = match target {
            Value::Object(map) => map,
            other => {
                return Err(Error::MergeType {
                    path: path.to_string(),
                    found: kind_of(&other),
                });
            }
        };

        let mut overrides = Map::new();
        for (key, value) in map.iter().filter(|(key, _)| key.as_str() != FROM) {
            overrides.insert(key.clone(), self.resolve(value, depth)?);
        }
        merge_into(&mut merged, overrides);

        Ok(Step::Replace(Value::Object(merged)))
    }
}

/// Deep merge: maps merge key by key, anything else replaces wholesale.
pub fn merge_into(base: &mut Map<String, Value>, overrides: Map<String, Value>) {
    for (key, value) in overrides {
        match value {
            Value::Object(incoming) => match base.get_mut(&key) {
                Some(Value::Object(existing)) => merge_into(existing, incoming),
                _ => {
                    base.insert(key, Value::Object(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}
