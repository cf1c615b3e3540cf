//! Directive handlers, one [`Transform`](crate::tree::Transform) per reserved key.
//!
//! | key      | handler                | replaces the node with                    |
//! |----------|------------------------|-------------------------------------------|
//! | `$from`  | [`Inherit`]            | the target map deep-merged with overrides |
//! | `$eval`  | [`Evaluate`]           | the expression's value (or a pending one) |
//! | `$each`  | [`Enumerate`]          | an alternative set                        |
//! | `$ref`   | [`Reference`]          | the referenced value                      |

pub mod each;
pub mod eval;
pub mod inherit;
pub mod reference;

pub use each::Enumerate;
pub use eval::{Evaluate, Outcome};
pub use inherit::Inherit;
pub use reference::Reference;

pub const FROM: &str = "$from";
pub const REF: &str = "$ref";
pub const EACH: &str = "$each";
pub const EVAL: &str = "$eval";

/// `$each` element standing for "only the sibling keys" (or null for scalars).
pub const NONE_SENTINEL: &str = "$None";

/// String argument of a directive.
pub(crate) fn string_arg<'v>(
    directive: &'static str,
    value: &'v serde_json::Value,
) -> crate::Result<&'v str> {
    value.as_str().ok_or_else(|| {
        crate::Error::shape(
            directive,
            format!("argument must be a string, found {}", crate::error::kind_of(value)),
        )
    })
}
