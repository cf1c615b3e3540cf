//! Error taxonomy for template expansion, classification and the node algebra.

/// Everything that can abort expansion of a config.
///
/// Classification misses are not errors; a value that matches no shape is
/// simply left as plain structure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A dotted/bracketed path did not lead anywhere.
    #[error("cannot resolve path {path:?}: {reason}")]
    PathResolution { path: String, reason: String },

    /// A directive map had the wrong keys or a non-string argument.
    #[error("malformed {directive} directive: {reason}")]
    DirectiveShape {
        directive: &'static str,
        reason: String,
    },

    /// `$from` pointed at something that is not a map.
    #[error("$from can only inherit from a map, {path:?} is {found}")]
    MergeType { path: String, found: &'static str },

    /// Expression failed for a reason other than a pending trial reference.
    #[error("cannot evaluate {expression:?}: {reason}")]
    Eval { expression: String, reason: String },

    /// `$each` alternatives have an unsupported shape.
    #[error("unsupported $each alternatives: {0}")]
    EachShape(String),

    /// Illegal `combine`/`cross` operands.
    #[error("cannot {op} {left} with {right}")]
    AlgebraType {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    /// Input nesting (or a directive cycle) went past the configured limit.
    #[error("maximum nesting depth of {limit} exceeded")]
    DepthExceeded { limit: usize },

    /// The config root is not a map.
    #[error("a config must be a map at the top level, found {found}")]
    TopLevel { found: &'static str },

    /// A deferred expression could not be finished with the bound trial.
    #[error("cannot resolve trial expression {expression:?}: {reason}")]
    Trial { expression: String, reason: String },
}

impl Error {
    pub(crate) fn path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::PathResolution {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(directive: &'static str, reason: impl Into<String>) -> Self {
        Error::DirectiveShape {
            directive,
            reason: reason.into(),
        }
    }

    pub(crate) fn eval(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Eval {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Short name of a JSON value's kind, for error messages.
pub(crate) fn kind_of(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a map",
    }
}
