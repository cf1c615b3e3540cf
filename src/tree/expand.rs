//! Generic recursive tree walk with combinatorial merging of alternatives.
//!
//! A [`Transform`] is offered every node top-down. If it rewrites a node the
//! rewrite is final and the walk does not descend into it. Otherwise the
//! walk descends; children that came back as [`Versions`] are multiplied out
//! (row-major) into whole-node variants.

use crate::config::Depth;
use crate::error::Result;
use crate::tree::versions::{Versions, product};
use serde_json::{Map, Value};

/// Outcome of offering one node to a transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Not a node this transform handles; descend into its children.
    Keep,
    /// Replace the node; its replacement is not walked again.
    Replace(Value),
    /// The node stands for several alternatives.
    Split(Versions<Value>),
}

/// Result of expanding a subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expanded {
    Single(Value),
    Versions(Versions<Value>),
}

impl Expanded {
    /// Concrete variants in enumeration order (one for `Single`).
    pub fn into_variants(self) -> Vec<Value> {
        match self {
            Expanded::Single(value) => vec![value],
            Expanded::Versions(versions) => versions.into_vec(),
        }
    }
}

pub trait Transform {
    fn apply(&self, node: &Value, depth: Depth) -> Result<Step>;
}

impl<F> Transform for F
where
    F: Fn(&Value, Depth) -> Result<Step>,
{
    fn apply(&self, node: &Value, depth: Depth) -> Result<Step> {
        self(node, depth)
    }
}

/// Walk `node` applying `transform` at every node.
pub fn expand<T: Transform + ?Sized>(node: &Value, transform: &T, depth: Depth) -> Result<Expanded> {
    match transform.apply(node, depth)? {
        Step::Replace(value) => return Ok(Expanded::Single(value)),
        Step::Split(versions) => return Ok(Expanded::Versions(versions)),
        Step::Keep => {}
    }

    match node {
        Value::Object(map) => expand_map(map, transform, depth),
        Value::Array(items) => expand_seq(items, transform, depth),
        scalar => Ok(Expanded::Single(scalar.clone())),
    }
}

fn expand_map<T: Transform + ?Sized>(
    map: &Map<String, Value>,
    transform: &T,
    depth: Depth,
) -> Result<Expanded> {
    let child_depth = depth.descend()?;
    let mut fixed = Map::new();
    let mut split: Vec<Versions<Value>> = Vec::new();

    for (key, value) in map {
        match expand(value, transform, child_depth)? {
            Expanded::Single(value) => {
                fixed.insert(key.clone(), value);
            }
            Expanded::Versions(versions) => split.push(versions),
        }
    }

    if split.is_empty() {
        return Ok(Expanded::Single(Value::Object(fixed)));
    }

    let sets: Vec<&Versions<Value>> = split.iter().collect();
    let variants = product(&sets)
        .into_iter()
        .map(|choice| {
            // `choice` follows the order in which split keys occur in `map`.
            let mut picks = choice.into_iter();
            let mut variant = Map::with_capacity(map.len());
            for key in map.keys() {
                let value = match fixed.get(key) {
                    Some(value) => value.clone(),
                    None => picks.next().unwrap_or(Value::Null),
                };
                variant.insert(key.clone(), value);
            }
            Value::Object(variant)
        })
        .collect();

    Ok(Expanded::Versions(Versions::from_nonempty(variants)))
}

fn expand_seq<T: Transform + ?Sized>(items: &[Value], transform: &T, depth: Depth) -> Result<Expanded> {
    let child_depth = depth.descend()?;
    let mut fixed: Vec<Option<Value>> = Vec::with_capacity(items.len());
    let mut split: Vec<Versions<Value>> = Vec::new();

    for item in items {
        match expand(item, transform, child_depth)? {
            Expanded::Single(value) => fixed.push(Some(value)),
            Expanded::Versions(versions) => {
                fixed.push(None);
                split.push(versions);
            }
        }
    }

    if split.is_empty() {
        return Ok(Expanded::Single(Value::Array(
            fixed.into_iter().flatten().collect(),
        )));
    }

    let sets: Vec<&Versions<Value>> = split.iter().collect();
    let variants = product(&sets)
        .into_iter()
        .map(|choice| {
            let mut picks = choice.into_iter();
            let variant = fixed
                .iter()
                .map(|slot| match slot {
                    Some(value) => value.clone(),
                    None => picks.next().unwrap_or(Value::Null),
                })
                .collect();
            Value::Array(variant)
        })
        .collect();

    Ok(Expanded::Versions(Versions::from_nonempty(variants)))
}
