//! `$each`: turn one node into an alternative set.

use super::{EACH, NONE_SENTINEL};
use crate::config::Depth;
use crate::error::{Error, Result, kind_of};
use crate::tree::{Expanded, Step, Transform, Versions, expand};
use serde_json::{Map, Value};
use tracing::trace;

#[derive(Debug, Clone, Copy, Default)]
pub struct Enumerate;

impl Transform for Enumerate {
    fn apply(&self, node: &Value, depth: Depth) -> Result<Step> {
        let Some(map) = node.as_object() else {
            return Ok(Step::Keep);
        };
        let Some(alternatives) = map.get(EACH) else {
            return Ok(Step::Keep);
        };
        let siblings: Map<String, Value> = map
            .iter()
            .filter(|(key, _)| key.as_str() != EACH)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let items = match expand(alternatives, self, depth.descend()?)? {
            Expanded::Single(value) => {
                let sibling_variants = expand(&Value::Object(siblings), self, depth)?.into_variants();
                let mut items = Vec::new();
                // Alternatives vary slowest, sibling variants fastest.
                for alternative in alternatives_of(value)? {
                    match alternative {
                        Alternative::Bare(value) => items.push(value),
                        Alternative::Keyed(element) => items.extend(
                            sibling_variants
                                .iter()
                                .map(|variant| with_siblings(element.clone(), variant)),
                        ),
                    }
                }
                items
            }
            // Nested `$each`: one flat set, not a set of sets.
            Expanded::Versions(versions) => versions
                .into_iter()
                .flat_map(|variant| match variant {
                    Value::Array(items) => items,
                    other => vec![other],
                })
                .collect(),
        };
        trace!(count = items.len(), "expanded $each");

        Versions::new(items)
            .map(Step::Split)
            .ok_or_else(|| Error::EachShape("no alternatives given".to_string()))
    }
}

/// One `$each` element before sibling keys are applied.
enum Alternative {
    /// Scalar alternative; siblings do not apply.
    Bare(Value),
    /// Map alternative (empty for the sentinel); siblings fill in missing keys.
    Keyed(Map<String, Value>),
}

fn is_sentinel(value: &Value) -> bool {
    value.as_str() == Some(NONE_SENTINEL)
}

/// Element keys win; siblings only fill in keys the element leaves unset.
fn with_siblings(mut element: Map<String, Value>, siblings: &Value) -> Value {
    if let Value::Object(siblings) = siblings {
        for (key, value) in siblings {
            if !element.contains_key(key) {
                element.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(element)
}

fn alternatives_of(value: Value) -> Result<Vec<Alternative>> {
    match value {
        Value::Array(items) if items.iter().all(|i| i.is_object() || is_sentinel(i)) => Ok(items
            .into_iter()
            .map(|item| match item {
                Value::Object(element) => Alternative::Keyed(element),
                _ => Alternative::Keyed(Map::new()),
            })
            .collect()),
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| Alternative::Bare(if is_sentinel(&item) { Value::Null } else { item }))
            .collect()),
        Value::Object(pairs) => Ok(pairs
            .into_iter()
            .map(|(key, value)| {
                let mut element = Map::new();
                element.insert(key, value);
                Alternative::Keyed(element)
            })
            .collect()),
        other => Err(Error::EachShape(format!(
            "expected a sequence or a map, found {}",
            kind_of(&other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn each(node: Value) -> Result<Vec<Value>> {
        Ok(expand(&node, &Enumerate, Limits::default().root())?.into_variants())
    }

    #[test]
    fn scalars_become_alternatives() {
        assert_eq!(each(json!({"$each": [1, 2, 3]})).unwrap(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn sentinel_and_maps_take_siblings() {
        let out = each(json!({"c": "dummy", "$each": ["$None", {"a": 150, "b": 64}]})).unwrap();
        assert_eq!(
            out,
            vec![json!({"c": "dummy"}), json!({"a": 150, "b": 64, "c": "dummy"})]
        );
    }

    #[test]
    fn element_keys_beat_siblings() {
        let out = each(json!({"a": 0, "keep": 1, "$each": [{"a": 1}, {"a": 2}]})).unwrap();
        assert_eq!(out, vec![json!({"a": 1, "keep": 1}), json!({"a": 2, "keep": 1})]);
    }

    #[test]
    fn scalar_alternatives_ignore_siblings() {
        let out = each(json!({"ignored": true, "$each": [1, "$None", {"a": 1}]})).unwrap();
        assert_eq!(out, vec![json!(1), Value::Null, json!({"a": 1})]);
    }

    #[test]
    fn map_alternatives_split_per_key() {
        let out = each(json!({"s": 1, "$each": {"x": 1, "y": 2}})).unwrap();
        assert_eq!(out, vec![json!({"x": 1, "s": 1}), json!({"y": 2, "s": 1})]);
    }

    #[test]
    fn map_alternative_keys_beat_siblings() {
        let out = each(json!({"x": 0, "$each": {"x": 1, "y": 2}})).unwrap();
        assert_eq!(out, vec![json!({"x": 1}), json!({"y": 2, "x": 0})]);
    }

    #[test]
    fn siblings_with_alternatives_multiply_out() {
        let out = each(json!({"$each": [{"x": 1}, {"x": 2}], "hp": {"$each": [10, 20]}})).unwrap();
        assert_eq!(
            out,
            vec![
                json!({"x": 1, "hp": 10}),
                json!({"x": 1, "hp": 20}),
                json!({"x": 2, "hp": 10}),
                json!({"x": 2, "hp": 20}),
            ]
        );
    }

    #[test]
    fn scalar_alternatives_do_not_multiply_with_siblings() {
        let out = each(json!({"hp": {"$each": [10, 20]}, "$each": [1, 2]})).unwrap();
        assert_eq!(out, vec![json!(1), json!(2)]);
    }

    #[test]
    fn nested_each_is_flattened() {
        let out = each(json!({"$each": [{"$each": [1, 2]}, 3]})).unwrap();
        // Inner expansion yields [1, 3] and [2, 3], concatenated.
        assert_eq!(out, vec![json!(1), json!(3), json!(2), json!(3)]);
    }

    #[test]
    fn siblings_multiply_with_other_keys() {
        let out = each(json!({"a": {"$each": [1, 2]}, "b": {"$each": ["x", "y"]}})).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[1], json!({"a": 1, "b": "y"}));
    }

    #[test]
    fn bad_shapes_fail() {
        assert!(matches!(each(json!({"$each": 3})), Err(Error::EachShape(_))));
        assert!(matches!(each(json!({"$each": []})), Err(Error::EachShape(_))));
    }
}
