//! Raw config trees: path lookup, alternative sets and the expanding walk.

pub mod expand;
pub mod path;
pub mod versions;

pub use expand::{Expanded, Step, Transform, expand};
pub use versions::Versions;
