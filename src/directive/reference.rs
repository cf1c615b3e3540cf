//! `$ref`: replace a node by a value found elsewhere in the same variant.

use super::{REF, string_arg};
use crate::config::Depth;
use crate::error::{Error, Result};
use crate::tree::{Expanded, Step, Transform, expand, path};
use serde_json::Value;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct Reference<'a> {
    context: &'a Value,
}

impl<'a> Reference<'a> {
    pub fn new(context: &'a Value) -> Self {
        Self { context }
    }
}

impl Transform for Reference<'_> {
    fn apply(&self, node: &Value, depth: Depth) -> Result<Step> {
        let Some(map) = node.as_object() else {
            return Ok(Step::Keep);
        };
        let Some(arg) = map.get(REF) else {
            return Ok(Step::Keep);
        };
        if map.len() != 1 {
            let others: Vec<&str> = map.keys().map(String::as_str).filter(|k| *k != REF).collect();
            return Err(Error::shape(
                REF,
                format!("$ref must be the only key, found {:?}", others),
            ));
        }
        let path = string_arg(REF, arg)?;
        trace!(path, "resolving $ref");

        let target = path::get(self.context, path)?;
        Ok(match expand(target, self, depth.descend()?)? {
            Expanded::Single(value) => Step::Replace(value),
            Expanded::Versions(versions) => Step::Split(versions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use serde_json::json;

    fn resolve(data: &Value) -> Result<Value> {
        let out = expand(data, &Reference::new(data), Limits::default().root())?;
        Ok(out.into_variants().remove(0))
    }

    #[test]
    fn nested_references_use_the_same_context() {
        let data = json!({
            "target": 1,
            "some_node": [{"some_val": {"$ref": "target"}}, "ignored"],
            "out": {"$ref": "some_node.0.some_val"},
        });
        assert_eq!(resolve(&data).unwrap()["out"], json!(1));
    }

    #[test]
    fn reference_must_be_alone() {
        let data = json!({"a": 1, "b": {"$ref": "a", "x": 1}});
        assert!(matches!(
            resolve(&data),
            Err(Error::DirectiveShape { directive: "$ref", .. })
        ));
    }

    #[test]
    fn path_must_exist() {
        let data = json!({"b": {"$ref": "a.b"}});
        assert!(matches!(resolve(&data), Err(Error::PathResolution { .. })));
    }

    #[test]
    fn self_reference_is_bounded() {
        let data = json!({"a": {"$ref": "a"}});
        assert!(matches!(resolve(&data), Err(Error::DepthExceeded { .. })));
    }
}
