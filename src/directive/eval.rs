//! `$eval`: compute a value from an expression.
//!
//! Before evaluation the text is rewritten:
//! - `$trial` becomes the trial marker identifier;
//! - every `$.path` / `$[0]` / `$['key']` reference is looked up in the
//!   locals (longest existing prefix) and replaced by a literal, leaving any
//!   unmatched tail as a trailing accessor;
//! - with a bound trial, every `__trial__.path` reference is replaced the
//!   same way from the trial structure.
//!
//! An expression whose only problem is the unbound trial marker is
//! [`Outcome::Pending`]; it is finished later with [`Evaluate::with_trial`].

use super::{EVAL, string_arg};
use crate::config::Depth;
use crate::error::{Error, Result};
use crate::expr::{self, Env, Failure, MAX_NESTING, TRIAL_MARKER, to_literal};
use crate::tree::{Expanded, Step, Transform, expand, path};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::trace;

/// `$` followed by one or more `.name`, `[0]`, `["key"]` or `['key']` steps.
static LOCAL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$(?:\[[0-9]+\]|\["[A-Za-z0-9_$]+"\]|\['[A-Za-z0-9_$]+'\]|\.[A-Za-z0-9_]+)+"#)
        .expect("local reference pattern is valid")
});

/// The trial marker followed by the same kind of steps.
static TRIAL_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"__trial__(?:\[[0-9]+\]|\["[A-Za-z0-9_$]+"\]|\['[A-Za-z0-9_$]+'\]|\.[A-Za-z0-9_]+)+"#)
        .expect("trial reference pattern is valid")
});

static NO_LOCALS: Value = Value::Null;

/// Result of one evaluation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resolved(Value),
    /// Needs a trial; carries the rewritten expression.
    Pending(String),
}

/// Evaluates `$eval` directives against `locals`, optionally with a trial.
#[derive(Debug, Clone, Copy)]
pub struct Evaluate<'a> {
    locals: &'a Value,
    trial: Option<&'a Value>,
}

impl<'a> Evaluate<'a> {
    /// Config-time evaluation; trial references stay pending.
    pub fn new(locals: &'a Value) -> Self {
        Self {
            locals,
            trial: None,
        }
    }

    /// Trial-time evaluation of previously pending expressions.
    pub fn with_trial(trial: &'a Value) -> Self {
        Self {
            locals: &NO_LOCALS,
            trial: Some(trial),
        }
    }

    /// Evaluate one `$eval` map.
    pub fn evaluate(&self, node: &Map<String, Value>, depth: Depth) -> Result<Outcome> {
        let depth = depth.descend()?;
        if node.len() != 1 {
            let others: Vec<&str> = node.keys().map(String::as_str).filter(|k| *k != EVAL).collect();
            return Err(Error::shape(
                EVAL,
                format!("$eval must be the only key, found {:?}", others),
            ));
        }
        let source = match node.get(EVAL) {
            Some(Value::String(text)) => text.clone(),
            Some(other @ (Value::Number(_) | Value::Bool(_))) => to_literal(other),
            Some(other) => string_arg(EVAL, other)?.to_string(),
            None => return Err(Error::shape(EVAL, "missing $eval key")),
        };

        let text = source.replace("$trial", TRIAL_MARKER);
        let text = self.substitute_locals(&text, depth)?;
        let text = match self.trial {
            Some(trial) => self.substitute_trial(&text, trial, depth)?,
            None => text,
        };
        trace!(expression = %text, "evaluating $eval");

        let env = match self.trial {
            Some(trial) => Env::new(self.locals).with_trial(trial),
            None => Env::new(self.locals),
        };
        match expr::evaluate(&text, &env) {
            Ok(Value::Object(result)) if result.contains_key(EVAL) => self.evaluate(&result, depth),
            Ok(value) => Ok(Outcome::Resolved(value)),
            Err(Failure::Unbound(name)) if name == TRIAL_MARKER && self.trial.is_none() => {
                trace!(expression = %text, "deferring $eval until a trial is bound");
                Ok(Outcome::Pending(text))
            }
            Err(Failure::TooDeep) => Err(Error::DepthExceeded { limit: MAX_NESTING }),
            Err(failure) => Err(self.failure(text, failure.to_string())),
        }
    }

    fn failure(&self, expression: String, reason: String) -> Error {
        if self.trial.is_some() {
            Error::Trial { expression, reason }
        } else {
            Error::Eval { expression, reason }
        }
    }

    fn substitute_locals(&self, text: &str, depth: Depth) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in LOCAL_REF.find_iter(text) {
            out.push_str(&text[last..found.start()]);
            last = found.end();

            let reference = found.as_str();
            let steps = path::segments(&reference[1..]);
            let (consumed, value) = path::longest_prefix(self.locals, &steps);
            if consumed == 0 {
                return Err(Error::eval(text, format!("{} does not exist", reference)));
            }
            out.push_str(&self.render(value, depth)?);
            for step in &steps[consumed..] {
                out.push_str(step.raw);
            }
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn substitute_trial(&self, text: &str, trial: &Value, depth: Depth) -> Result<String> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in TRIAL_REF.find_iter(text) {
            out.push_str(&text[last..found.start()]);
            last = found.end();

            let reference = found.as_str();
            let steps = path::segments(&reference[TRIAL_MARKER.len()..]);
            let (consumed, value) = path::longest_prefix(trial, &steps);
            if consumed == 0 {
                // Left to the evaluator, where the marker is bound to the whole trial.
                out.push_str(reference);
                continue;
            }
            // With a trial bound, referenced `$eval`s resolve or fail here.
            out.push_str(&self.render(value, depth)?);
            for step in &steps[consumed..] {
                out.push_str(step.raw);
            }
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    /// Literal text for a referenced value, evaluating it first if needed.
    fn render(&self, value: &Value, depth: Depth) -> Result<String> {
        if let Some(node) = value.as_object().filter(|m| m.contains_key(EVAL)) {
            return Ok(match self.evaluate(node, depth)? {
                Outcome::Resolved(value) => to_literal(&value),
                Outcome::Pending(text) => format!("({})", text),
            });
        }
        let resolved = match expand(value, self, depth)? {
            Expanded::Single(value) => value,
            Expanded::Versions(versions) => Value::Array(versions.into_vec()),
        };
        Ok(to_literal(&resolved))
    }
}

impl Transform for Evaluate<'_> {
    fn apply(&self, node: &Value, depth: Depth) -> Result<Step> {
        let Some(map) = node.as_object().filter(|m| m.contains_key(EVAL)) else {
            return Ok(Step::Keep);
        };
        Ok(Step::Replace(match self.evaluate(map, depth)? {
            Outcome::Resolved(value) => value,
            Outcome::Pending(text) => {
                let mut pending = Map::new();
                pending.insert(EVAL.to_string(), Value::String(text));
                Value::Object(pending)
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn eval_with(node: Value, locals: &Value) -> Result<Outcome> {
        let map = node.as_object().unwrap().clone();
        Evaluate::new(locals).evaluate(&map, Limits::default().root())
    }

    #[test]
    fn local_references_are_substituted() {
        let locals = json!({"value": 2, "my_key": "some string"});
        assert_eq!(
            eval_with(json!({"$eval": "2 + 5 * $.value"}), &locals).unwrap(),
            Outcome::Resolved(json!(12))
        );
        assert_eq!(
            eval_with(json!({"$eval": "len($.my_key)"}), &locals).unwrap(),
            Outcome::Resolved(json!(11))
        );
    }

    #[test]
    fn residual_steps_stay_as_accessors() {
        let locals = json!({"a": {"b": [{"$eval": "'hey ' * 2"}]}});
        assert_eq!(
            eval_with(json!({"$eval": "$.a.b[0]"}), &locals).unwrap(),
            Outcome::Resolved(json!("hey hey "))
        );
        let locals = json!({"cfg": {"lrs": [0.1, 0.2]}});
        assert_eq!(
            eval_with(json!({"$eval": "$.cfg.lrs[1] * 10"}), &locals).unwrap(),
            Outcome::Resolved(json!(2.0))
        );
    }

    #[test]
    fn referenced_evals_are_resolved_first() {
        let locals = json!({"base": {"$eval": "3 * 2"}});
        assert_eq!(
            eval_with(json!({"$eval": "$.base + 1"}), &locals).unwrap(),
            Outcome::Resolved(json!(7))
        );
    }

    #[test]
    fn trial_references_are_deferred() {
        assert_eq!(
            eval_with(json!({"$eval": "$trial.algorithm.some_value * 2"}), &json!({})).unwrap(),
            Outcome::Pending("__trial__.algorithm.some_value * 2".to_string())
        );
    }

    #[test]
    fn pending_locals_are_inlined_in_parentheses() {
        let locals = json!({"epochs": {"$eval": "$trial.dataset.meta.size + 1"}});
        assert_eq!(
            eval_with(json!({"$eval": "$.epochs * 2"}), &locals).unwrap(),
            Outcome::Pending("(__trial__.dataset.meta.size + 1) * 2".to_string())
        );
    }

    #[test]
    fn trial_pass_finishes_pending_expressions() {
        let trial = json!({"something": [1, 2, 3], "name": "x"});
        let node = json!({"$eval": "2 + __trial__.something[0]"});
        let out = Evaluate::with_trial(&trial)
            .evaluate(node.as_object().unwrap(), Limits::default().root())
            .unwrap();
        assert_eq!(out, Outcome::Resolved(json!(3)));

        let node = json!({"$eval": "__trial__.name + '-run'"});
        let out = Evaluate::with_trial(&trial)
            .evaluate(node.as_object().unwrap(), Limits::default().root())
            .unwrap();
        assert_eq!(out, Outcome::Resolved(json!("x-run")));
    }

    #[test]
    fn failures_in_trial_mode_are_trial_errors() {
        let trial = json!({});
        let node = json!({"$eval": "__trial__.missing + 1"});
        let err = Evaluate::with_trial(&trial)
            .evaluate(node.as_object().unwrap(), Limits::default().root())
            .unwrap_err();
        assert!(matches!(err, Error::Trial { .. }));
    }

    #[test]
    fn other_failures_are_fatal() {
        assert!(matches!(
            eval_with(json!({"$eval": "1 / 0"}), &json!({})),
            Err(Error::Eval { .. })
        ));
        assert!(matches!(
            eval_with(json!({"$eval": "unknown_name + 1"}), &json!({})),
            Err(Error::Eval { .. })
        ));
        assert!(matches!(
            eval_with(json!({"$eval": "$.nothing"}), &json!({"a": 1})),
            Err(Error::Eval { .. })
        ));
    }

    #[test]
    fn deeply_nested_expressions_exceed_the_depth_limit() {
        let text = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        assert_eq!(
            eval_with(json!({ "$eval": text }), &json!({})),
            Err(Error::DepthExceeded { limit: MAX_NESTING })
        );
    }

    #[test]
    fn eval_must_be_alone() {
        assert!(matches!(
            eval_with(json!({"$eval": "1", "x": 2}), &json!({})),
            Err(Error::DirectiveShape { directive: "$eval", .. })
        ));
    }

    #[test]
    fn eval_results_that_are_evals_are_evaluated_again() {
        let locals = json!({"inner": {"$eval": "40 + 2"}});
        assert_eq!(
            eval_with(json!({"$eval": "inner"}), &locals).unwrap(),
            Outcome::Resolved(json!(42))
        );
    }
}
