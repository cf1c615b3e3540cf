//! Sandboxed value expressions used by `$eval`.
//!
//! Only literals, arithmetic, comparisons, indexing and calls to a fixed
//! list of numeric/string builtins are available. Names resolve to the
//! caller's top-level locals, the trial marker (when a trial is bound),
//! `uid` and a few math constants; nothing else is reachable.

mod interp;
mod lexer;
pub mod literal;
mod parser;

use serde_json::{Map, Value};

pub use literal::to_literal;
pub use parser::MAX_NESTING;

/// Identifier that `$trial` is rewritten to before evaluation.
pub const TRIAL_MARKER: &str = "__trial__";

/// Why an expression produced no value.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// A name is not bound in the environment.
    Unbound(String),
    /// Syntax, type or domain error.
    Invalid(String),
    /// Nesting went past [`MAX_NESTING`].
    TooDeep,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Unbound(name) => write!(f, "name {:?} is not defined", name),
            Failure::Invalid(reason) => f.write_str(reason),
            Failure::TooDeep => write!(f, "expression nested deeper than {}", MAX_NESTING),
        }
    }
}

/// Bindings visible to one evaluation.
#[derive(Debug, Clone)]
pub struct Env<'a> {
    locals: Option<&'a Map<String, Value>>,
    trial: Option<&'a Value>,
    uid: String,
}

impl<'a> Env<'a> {
    /// Top-level keys of `locals` become names (if it is a map).
    pub fn new(locals: &'a Value) -> Self {
        Self {
            locals: locals.as_object(),
            trial: None,
            uid: fresh_uid(),
        }
    }

    pub fn empty() -> Self {
        Self {
            locals: None,
            trial: None,
            uid: fresh_uid(),
        }
    }

    /// Bind the trial marker to `trial`.
    pub fn with_trial(mut self, trial: &'a Value) -> Self {
        self.trial = Some(trial);
        self
    }

    pub fn trial(&self) -> Option<&'a Value> {
        self.trial
    }

    pub fn locals(&self) -> Option<&'a Map<String, Value>> {
        self.locals
    }
}

/// Last group of a v4 uuid: 12 lowercase hex characters.
fn fresh_uid() -> String {
    let id = uuid::Uuid::new_v4().to_string();
    id.rsplit('-').next().unwrap_or_default().to_string()
}

/// Parse and evaluate `text`.
pub fn evaluate(text: &str, env: &Env<'_>) -> Result<Value, Failure> {
    let tokens = lexer::tokenize(text)?;
    let expr = parser::parse(&tokens)?;
    interp::eval(&expr, env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn eval(text: &str) -> Value {
        evaluate(text, &Env::empty()).unwrap()
    }

    #[test]
    fn arithmetic_and_comparisons() {
        assert_eq!(eval("2 + 5 * 2"), json!(12));
        assert_eq!(eval("7 / 2"), json!(3.5));
        assert_eq!(eval("-7 // 2"), json!(-4));
        assert_eq!(eval("-7 % 3"), json!(2));
        assert_eq!(eval("2 ** 10"), json!(1024));
        assert_eq!(eval("-2 ** 2"), json!(-4));
        assert_eq!(eval("pow(7, 2)"), json!(49.0));
        assert_eq!(eval("1 if 2 > 1 else 0"), json!(1));
        assert_eq!(eval("1 < 2 < 3"), json!(true));
        assert_eq!(eval("1 == 1.0"), json!(true));
    }

    #[test]
    fn strings_lists_and_dicts() {
        assert_eq!(eval("'ab' * 2 + 'c'"), json!("ababc"));
        assert_eq!(eval("[1, 2] + [3]"), json!([1, 2, 3]));
        assert_eq!(eval("{'a': [10, 20]}['a'][-1]"), json!(20));
        assert_eq!(eval("{'a': {'b': 1}}.a.b"), json!(1));
        assert_eq!(eval("str(3) + 'x'"), json!("3x"));
        assert_eq!(eval("max([3, 9, 4])"), json!(9));
        assert_eq!(eval("round(2.5)"), json!(2));
        assert_eq!(eval("len(uid)"), json!(12));
    }

    #[test]
    fn locals_are_bound_by_top_level_key() {
        let locals = json!({"some_value": 2, "nested": {"k": "v"}});
        let env = Env::new(&locals);
        assert_eq!(evaluate("len(uid) + pow(some_value, 2)", &env).unwrap(), json!(16.0));
        assert_eq!(evaluate("nested['k']", &env).unwrap(), json!("v"));
    }

    #[test]
    fn unknown_names_are_unbound() {
        assert_eq!(
            evaluate("open('x')", &Env::empty()),
            Err(Failure::Unbound("open".to_string()))
        );
        assert_eq!(
            evaluate("__trial__.algorithm", &Env::empty()),
            Err(Failure::Unbound(TRIAL_MARKER.to_string()))
        );
    }

    #[test]
    fn trial_binding() {
        let trial = json!({"algorithm": {"image": "img"}});
        let env = Env::empty().with_trial(&trial);
        assert_eq!(evaluate("__trial__.algorithm.image", &env).unwrap(), json!("img"));
    }

    #[test]
    fn errors_are_invalid() {
        assert!(matches!(evaluate("1 / 0", &Env::empty()), Err(Failure::Invalid(_))));
        assert!(matches!(evaluate("'a' - 1", &Env::empty()), Err(Failure::Invalid(_))));
        assert!(matches!(evaluate("pow", &Env::empty()), Err(Failure::Invalid(_))));
        assert!(matches!(evaluate("(1", &Env::empty()), Err(Failure::Invalid(_))));
    }

    #[test]
    fn repetition_is_bounded() {
        assert_eq!(
            evaluate("'ab' * 9223372036854775807", &Env::empty()),
            Err(Failure::Invalid("repetition too large".to_string()))
        );
        assert_eq!(
            evaluate("[1, 2] * 9223372036854775807", &Env::empty()),
            Err(Failure::Invalid("repetition too large".to_string()))
        );
        assert_eq!(eval("'' * 9223372036854775807"), json!(""));
        assert_eq!(eval("[] * 9223372036854775807"), json!([]));
        assert_eq!(eval("3 * 'ab'"), json!("ababab"));
        assert_eq!(eval("[0] * -2"), json!([]));
    }

    #[test]
    fn nesting_is_bounded() {
        let parens = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));
        assert_eq!(evaluate(&parens, &Env::empty()), Err(Failure::TooDeep));
        let negations = format!("{}1", "-".repeat(5000));
        assert_eq!(evaluate(&negations, &Env::empty()), Err(Failure::TooDeep));
        let chain = vec!["1"; 10_000].join(" + ");
        assert_eq!(evaluate(&chain, &Env::empty()), Err(Failure::TooDeep));
        let lists = format!("{}{}", "[".repeat(1000), "]".repeat(1000));
        assert_eq!(evaluate(&lists, &Env::empty()), Err(Failure::TooDeep));

        let fine = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert_eq!(evaluate(&fine, &Env::empty()), Ok(json!(1)));
        assert_eq!(evaluate(&vec!["1"; 50].join(" + "), &Env::empty()), Ok(json!(50)));
    }
}
