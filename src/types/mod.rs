//! Classified config values and the merged top-level [`Config`].

pub mod algebra;
pub mod classify;
pub mod node;

pub use classify::{classify, classify_top_level};
pub use node::{Algorithm, Algorithms, Dataset, Datasets, Experiment, Experiments};

use crate::tree::Versions;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use serde_json::Value;

/// A resolved value after shape recognition.
///
/// Serializes back to plain JSON; alternative sets become arrays.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Algorithm(Algorithm),
    Algorithms(Algorithms),
    Dataset(Dataset),
    Datasets(Datasets),
    Experiment(Experiment),
    Experiments(Experiments),
    /// Distinct values a key took across variants, in first-seen order.
    Versions(Versions<ConfigValue>),
    /// Anything that matched no shape.
    Plain(Value),
}

impl ConfigValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Algorithm(_) => "an algorithm",
            ConfigValue::Algorithms(_) => "algorithms",
            ConfigValue::Dataset(_) => "a dataset",
            ConfigValue::Datasets(_) => "datasets",
            ConfigValue::Experiment(_) => "an experiment",
            ConfigValue::Experiments(_) => "experiments",
            ConfigValue::Versions(_) => "an alternative set",
            ConfigValue::Plain(value) => crate::error::kind_of(value),
        }
    }

    /// Every experiment this value stands for, flattening alternative sets.
    ///
    /// `None` if anything in it is not an experiment.
    pub fn experiments(&self) -> Option<Experiments> {
        match self {
            ConfigValue::Experiment(experiment) => Experiments::new(vec![experiment.clone()]),
            ConfigValue::Experiments(experiments) => Some(experiments.clone()),
            ConfigValue::Versions(versions) => {
                let mut out = Vec::new();
                for alternative in versions {
                    out.extend(alternative.experiments()?);
                }
                Experiments::new(out)
            }
            _ => None,
        }
    }

    /// Plain JSON form.
    pub fn to_value(&self) -> Value {
        match self {
            ConfigValue::Algorithm(algorithm) => algorithm.to_value(),
            ConfigValue::Dataset(dataset) => dataset.to_value(),
            ConfigValue::Experiment(experiment) => experiment.to_value(),
            ConfigValue::Algorithms(items) => {
                Value::Array(items.iter().map(Algorithm::to_value).collect())
            }
            ConfigValue::Datasets(items) => Value::Array(items.iter().map(Dataset::to_value).collect()),
            ConfigValue::Experiments(items) => {
                Value::Array(items.iter().map(Experiment::to_value).collect())
            }
            ConfigValue::Versions(versions) => {
                Value::Array(versions.iter().map(ConfigValue::to_value).collect())
            }
            ConfigValue::Plain(value) => value.clone(),
        }
    }
}

/// Top-level keys with their classified values, in input order.
///
/// Equality ignores key order.
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: Vec<(String, ConfigValue)>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Replaces the value if `key` is already present, keeping its position.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl FromIterator<(String, ConfigValue)> for Config {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        let mut config = Config::new();
        for (key, value) in iter {
            config.insert(key, value);
        }
        config
    }
}

impl IntoIterator for Config {
    type Item = (String, ConfigValue);
    type IntoIter = std::vec::IntoIter<(String, ConfigValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn config_equality_ignores_order() {
        let a: Config = [
            ("x".to_string(), ConfigValue::Plain(json!(1))),
            ("y".to_string(), ConfigValue::Plain(json!(2))),
        ]
        .into_iter()
        .collect();
        let b: Config = [
            ("y".to_string(), ConfigValue::Plain(json!(2))),
            ("x".to_string(), ConfigValue::Plain(json!(1))),
        ]
        .into_iter()
        .collect();
        assert_eq!(a, b);
        assert_eq!(a.keys().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn serializes_as_plain_json() {
        let mut config = Config::new();
        config.insert(
            "v",
            ConfigValue::Versions(
                Versions::new(vec![ConfigValue::Plain(json!(1)), ConfigValue::Plain(json!("a"))])
                    .unwrap(),
            ),
        );
        config.insert("p", ConfigValue::Plain(json!({"k": null})));
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({"v": [1, "a"], "p": {"k": null}})
        );
        assert_eq!(config.get("v").unwrap().to_value(), json!([1, "a"]));
    }

    #[test]
    fn experiments_flatten_alternatives() {
        let experiment = |image: &str| {
            classify(json!({
                "algorithm": {"image": image, "instance": "x"},
                "dataset": {"path": {"train": "t"}},
            }))
        };
        let versions =
            ConfigValue::Versions(Versions::new(vec![experiment("a"), experiment("b")]).unwrap());
        let images: Vec<String> = versions
            .experiments()
            .unwrap()
            .iter()
            .map(|e| e.algorithm.image().to_string())
            .collect();
        assert_eq!(images, vec!["a", "b"]);
        assert_eq!(ConfigValue::Plain(json!(1)).experiments(), None);
    }
}
