//! Tunables shared by every traversal.

use crate::error::{Error, Result};

/// Default maximum nesting depth for expansion and nested directive lookups.
pub const DEFAULT_MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Limits {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Depth counter starting at the root of a traversal.
    pub fn root(&self) -> Depth {
        Depth {
            current: 0,
            limit: self.max_depth,
        }
    }
}

/// Position of a traversal relative to its limit.
///
/// Every descent (into a child, or into the target of a `$from`, `$ref` or
/// `$eval` lookup) goes through [`Depth::descend`], so cyclic directives
/// terminate with [`Error::DepthExceeded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Depth {
    current: usize,
    limit: usize,
}

impl Depth {
    pub fn descend(self) -> Result<Depth> {
        if self.current >= self.limit {
            return Err(Error::DepthExceeded { limit: self.limit });
        }
        Ok(Depth {
            current: self.current + 1,
            limit: self.limit,
        })
    }

    pub fn current(&self) -> usize {
        self.current
    }
}
