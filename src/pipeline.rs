//! The four directive passes and the full config transformation.
//!
//! 1. `$from` against the original config,
//! 2. `$eval` with the inherited config as locals (trial references stay pending),
//! 3. `$each`, which may split the config into variants,
//! 4. `$ref` inside each variant, against that variant only.

use crate::config::Limits;
use crate::directive::{EVAL, Enumerate, Evaluate, Inherit, Reference};
use crate::error::{Error, Result, kind_of};
use crate::merge::merge_versions;
use crate::tree::{Transform, expand};
use crate::types::{Config, ConfigValue, Experiments, classify_top_level};
use serde_json::Value;
use tracing::{debug, warn};

/// Expands configs, classifies them and finishes experiments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Generator {
    limits: Limits,
}

impl Generator {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Concrete variants of `raw`, in enumeration order.
    pub fn expand(&self, raw: &Value) -> Result<Vec<Value>> {
        if !raw.is_object() {
            return Err(Error::TopLevel {
                found: kind_of(raw),
            });
        }

        let inherited = self.run(raw, &Inherit::new(raw))?;
        debug!(pass = "$from", variants = inherited.len(), "pass done");

        let mut evaluated = Vec::with_capacity(inherited.len());
        for locals in &inherited {
            evaluated.extend(self.run(locals, &Evaluate::new(locals))?);
        }
        debug!(pass = "$eval", variants = evaluated.len(), "pass done");

        let mut enumerated = Vec::with_capacity(evaluated.len());
        for variant in &evaluated {
            enumerated.extend(self.run(variant, &Enumerate)?);
        }
        debug!(pass = "$each", variants = enumerated.len(), "pass done");

        let mut resolved = Vec::with_capacity(enumerated.len());
        for variant in &enumerated {
            resolved.extend(self.run(variant, &Reference::new(variant))?);
        }
        debug!(pass = "$ref", variants = resolved.len(), "pass done");
        Ok(resolved)
    }

    /// Expand, classify each variant and merge the variants back into one config.
    pub fn transform(&self, raw: &Value) -> Result<Config> {
        let classified = self
            .expand(raw)?
            .into_iter()
            .map(classify_top_level)
            .collect::<Result<Vec<_>>>()?;
        let config = merge_versions(classified);

        for (key, value) in config.iter() {
            if matches!(value, ConfigValue::Plain(_)) && has_pending(&value.to_value()) {
                warn!(key = %key, "value keeps a $trial expression but is not part of an experiment");
            }
        }
        debug!(keys = config.len(), "config transformed");
        Ok(config)
    }

    /// Resolve the trial expressions of every experiment.
    pub fn materialize(&self, experiments: &Experiments) -> Result<Experiments> {
        debug!(experiments = experiments.len(), "materializing");
        experiments.materialize(&self.limits)
    }

    fn run<T: Transform>(&self, node: &Value, transform: &T) -> Result<Vec<Value>> {
        Ok(expand(node, transform, self.limits.root())?.into_variants())
    }
}

/// Concrete variants of `raw` with the default limits.
pub fn expand_config(raw: &Value) -> Result<Vec<Value>> {
    Generator::default().expand(raw)
}

/// Classified, merged config for `raw` with the default limits.
pub fn transform_config(raw: &Value) -> Result<Config> {
    Generator::default().transform(raw)
}

fn has_pending(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key(EVAL) || map.values().any(has_pending),
        Value::Array(items) => items.iter().any(has_pending),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn end_to_end_variants() {
        let raw = json!({
            "base": {"msg": "hi"},
            "a": {"$from": "base", "smth": {"$each": [{"$eval": "pow(7, 2)"}, 2]}},
            "b": [{"$ref": "a.msg"}],
        });
        let variants = expand_config(&raw).unwrap();
        assert_eq!(
            variants,
            vec![
                json!({"base": {"msg": "hi"}, "a": {"msg": "hi", "smth": 49.0}, "b": ["hi"]}),
                json!({"base": {"msg": "hi"}, "a": {"msg": "hi", "smth": 2}, "b": ["hi"]}),
            ]
        );
    }

    #[test]
    fn no_each_means_one_variant() {
        let raw = json!({"x": {"$eval": "1 + 1"}, "y": [1, 2]});
        assert_eq!(expand_config(&raw).unwrap(), vec![json!({"x": 2, "y": [1, 2]})]);
    }

    #[test]
    fn references_stay_inside_their_variant() {
        let raw = json!({
            "lr": {"$each": [0.1, 0.2]},
            "copy": {"$ref": "lr"},
        });
        let variants = expand_config(&raw).unwrap();
        assert_eq!(
            variants,
            vec![json!({"lr": 0.1, "copy": 0.1}), json!({"lr": 0.2, "copy": 0.2})]
        );
    }

    #[test]
    fn evaluate_sees_inherited_values() {
        let raw = json!({
            "base": {"n": 3},
            "child": {"$from": "base"},
            "total": {"$eval": "$.child.n * 2"},
        });
        let variants = expand_config(&raw).unwrap();
        assert_eq!(variants[0]["total"], json!(6));
    }

    #[test]
    fn transform_merges_variants() {
        let raw = json!({
            "algo": {"image": {"$each": ["1", "2"]}, "instance": "x"},
            "fixed": 1,
        });
        let config = transform_config(&raw).unwrap();
        assert_eq!(config.get("fixed"), Some(&ConfigValue::Plain(json!(1))));
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "algo": [{"image": "1", "instance": "x"}, {"image": "2", "instance": "x"}],
                "fixed": 1,
            })
        );
    }

    #[test]
    fn root_must_be_a_map() {
        assert_eq!(
            expand_config(&json!([1, 2])),
            Err(Error::TopLevel { found: "a sequence" })
        );
    }

    #[test]
    fn errors_abort_the_whole_config() {
        let raw = json!({"ok": 1, "bad": {"$ref": "missing"}});
        assert!(matches!(expand_config(&raw), Err(Error::PathResolution { .. })));
    }

    #[test]
    fn custom_depth_limit() {
        let raw = json!({"a": {"b": {"c": {"d": 1}}}});
        let generator = Generator::new(Limits::with_max_depth(2));
        assert_eq!(generator.expand(&raw), Err(Error::DepthExceeded { limit: 2 }));
    }

    #[test]
    fn pending_detection() {
        assert!(has_pending(&json!({"a": [{"$eval": "__trial__.x"}]})));
        assert!(!has_pending(&json!({"a": [1]})));
    }
}
