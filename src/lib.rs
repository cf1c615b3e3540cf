//! Experiment config templating.
//!
//! A raw config (parsed YAML/JSON) may contain directives:
//! `$from` (inherit and override), `$eval` (computed values), `$each`
//! (alternatives) and `$ref` (in-variant references). [`Generator::expand`]
//! resolves them into concrete variants, [`Generator::transform`] also
//! classifies algorithms, datasets and experiments and folds the variants
//! back into one [`Config`].

pub mod config;
pub mod directive;
pub mod error;
pub mod expr;
pub mod merge;
pub mod pipeline;
pub mod tree;
pub mod types;

pub use config::{DEFAULT_MAX_DEPTH, Limits};
pub use error::{Error, Result};
pub use merge::merge_versions;
pub use pipeline::{Generator, expand_config, transform_config};
pub use tree::Versions;
pub use types::{
    Algorithm, Algorithms, Config, ConfigValue, Dataset, Datasets, Experiment, Experiments,
    classify,
};
