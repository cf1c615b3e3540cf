//! Typed config elements recognized by shape.
//!
//! Each type keeps the underlying map untouched; verification only decides
//! whether a value has the right shape. `TryFrom<Value>` hands the value
//! back on a miss so callers can try the next shape.

use crate::config::Limits;
use crate::directive::Evaluate;
use crate::error::{Error, Result};
use crate::tree::{Expanded, expand};
use serde::Serialize;
use serde_json::{Map, Value};

fn is_map_or_absent(map: &Map<String, Value>, key: &str) -> bool {
    map.get(key).is_none_or(Value::is_object)
}

/// Map with string `image` and `instance`, optional map `hyperparameters`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Algorithm(Map<String, Value>);

impl Algorithm {
    pub fn verify(value: &Value) -> bool {
        value.as_object().is_some_and(Algorithm::verify_map)
    }

    fn verify_map(map: &Map<String, Value>) -> bool {
        map.get("image").is_some_and(Value::is_string)
            && map.get("instance").is_some_and(Value::is_string)
            && is_map_or_absent(map, "hyperparameters")
    }

    pub fn image(&self) -> &str {
        self.0.get("image").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn instance(&self) -> &str {
        self.0.get("instance").and_then(Value::as_str).unwrap_or_default()
    }

    /// Empty when the key is absent.
    pub fn hyperparameters(&self) -> Map<String, Value> {
        self.0
            .get("hyperparameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl TryFrom<Value> for Algorithm {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Object(map) if Algorithm::verify_map(&map) => Ok(Algorithm(map)),
            other => Err(other),
        }
    }
}

/// Map with a non-empty map `path` and optional map `meta`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Dataset(Map<String, Value>);

impl Dataset {
    pub fn verify(value: &Value) -> bool {
        value.as_object().is_some_and(Dataset::verify_map)
    }

    fn verify_map(map: &Map<String, Value>) -> bool {
        map.get("path")
            .and_then(Value::as_object)
            .is_some_and(|path| !path.is_empty())
            && is_map_or_absent(map, "meta")
    }

    pub fn path(&self) -> Option<&Map<String, Value>> {
        self.0.get("path").and_then(Value::as_object)
    }

    pub fn meta(&self) -> Map<String, Value> {
        self.0
            .get("meta")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl TryFrom<Value> for Dataset {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Object(map) if Dataset::verify_map(&map) => Ok(Dataset(map)),
            other => Err(other),
        }
    }
}

/// One algorithm run on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Experiment {
    pub algorithm: Algorithm,
    pub dataset: Dataset,
}

impl Experiment {
    pub fn pair(algorithm: Algorithm, dataset: Dataset) -> Self {
        Self { algorithm, dataset }
    }

    /// `algorithm` and `dataset` keys of the right shapes; other keys are ignored.
    pub fn verify(value: &Value) -> bool {
        value.as_object().is_some_and(|map| {
            map.get("algorithm").is_some_and(Algorithm::verify)
                && map.get("dataset").is_some_and(Dataset::verify)
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("algorithm".to_string(), self.algorithm.to_value());
        map.insert("dataset".to_string(), self.dataset.to_value());
        Value::Object(map)
    }

    /// Finish every pending `$eval` using this experiment as the trial.
    pub fn materialize(&self, limits: &Limits) -> Result<Experiment> {
        let trial = self.to_value();
        let evaluate = Evaluate::with_trial(&trial);
        let resolve = |value: Value, part: &str| -> Result<Value> {
            match expand(&value, &evaluate, limits.root())? {
                Expanded::Single(value) => Ok(value),
                Expanded::Versions(_) => Err(Error::Trial {
                    expression: part.to_string(),
                    reason: "trial resolution produced alternatives".to_string(),
                }),
            }
        };

        let algorithm = Algorithm::try_from(resolve(trial["algorithm"].clone(), "algorithm")?)
            .map_err(|_| Error::Trial {
                expression: "algorithm".to_string(),
                reason: "no longer an algorithm after trial resolution".to_string(),
            })?;
        let dataset = Dataset::try_from(resolve(trial["dataset"].clone(), "dataset")?).map_err(
            |_| Error::Trial {
                expression: "dataset".to_string(),
                reason: "no longer a dataset after trial resolution".to_string(),
            },
        )?;
        Ok(Experiment::pair(algorithm, dataset))
    }
}

impl TryFrom<Value> for Experiment {
    type Error = Value;

    fn try_from(value: Value) -> std::result::Result<Self, Value> {
        if !Experiment::verify(&value) {
            return Err(value);
        }
        match (
            Algorithm::try_from(value["algorithm"].clone()),
            Dataset::try_from(value["dataset"].clone()),
        ) {
            (Ok(algorithm), Ok(dataset)) => Ok(Experiment::pair(algorithm, dataset)),
            _ => Err(value),
        }
    }
}

macro_rules! collection {
    ($(#[$doc:meta])* $name:ident, $item:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Serialize)]
        #[serde(transparent)]
        pub struct $name(Vec<$item>);

        impl $name {
            /// Non-empty sequence where every element has the element shape.
            pub fn verify(value: &Value) -> bool {
                value
                    .as_array()
                    .is_some_and(|items| !items.is_empty() && items.iter().all($item::verify))
            }

            /// `None` if `items` is empty.
            pub fn new(items: Vec<$item>) -> Option<Self> {
                (!items.is_empty()).then_some(Self(items))
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn iter(&self) -> std::slice::Iter<'_, $item> {
                self.0.iter()
            }

            pub fn as_slice(&self) -> &[$item] {
                &self.0
            }

            pub fn into_vec(self) -> Vec<$item> {
                self.0
            }

            pub(crate) fn from_vec(items: Vec<$item>) -> Self {
                Self(items)
            }
        }

        impl TryFrom<Value> for $name {
            type Error = Value;

            fn try_from(value: Value) -> std::result::Result<Self, Value> {
                let parsed: Option<Vec<$item>> = match value.as_array() {
                    Some(items) if !items.is_empty() => items
                        .iter()
                        .map(|item| $item::try_from(item.clone()).ok())
                        .collect(),
                    _ => None,
                };
                match parsed {
                    Some(items) => Ok(Self(items)),
                    None => Err(value),
                }
            }
        }

        impl IntoIterator for $name {
            type Item = $item;
            type IntoIter = std::vec::IntoIter<$item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.into_iter()
            }
        }

        impl<'a> IntoIterator for &'a $name {
            type Item = &'a $item;
            type IntoIter = std::slice::Iter<'a, $item>;

            fn into_iter(self) -> Self::IntoIter {
                self.0.iter()
            }
        }
    };
}

collection!(Algorithms, Algorithm);
collection!(Datasets, Dataset);
collection!(
    /// Terminal collection: never crossed with anything.
    Experiments,
    Experiment
);

impl Experiments {
    pub fn materialize(&self, limits: &Limits) -> Result<Experiments> {
        Ok(Experiments(
            self.iter()
                .map(|experiment| experiment.materialize(limits))
                .collect::<Result<_>>()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn algorithm() -> Value {
        json!({"image": "img", "instance": "ml.m5.large", "hyperparameters": {"epochs": 1}})
    }

    fn dataset() -> Value {
        json!({"path": {"train": "s3://bucket/train"}, "meta": {"size": 10}})
    }

    #[test]
    fn algorithm_shape() {
        assert!(Algorithm::verify(&algorithm()));
        assert!(Algorithm::verify(&json!({"image": "i", "instance": "x"})));
        assert!(!Algorithm::verify(&json!({"image": "i"})));
        assert!(!Algorithm::verify(&json!({"image": 1, "instance": "x"})));
        assert!(!Algorithm::verify(
            &json!({"image": "i", "instance": "x", "hyperparameters": [1]})
        ));
        let algo = Algorithm::try_from(json!({"image": "i", "instance": "x"})).unwrap();
        assert_eq!(algo.hyperparameters(), Map::new());
    }

    #[test]
    fn dataset_shape() {
        assert!(Dataset::verify(&dataset()));
        assert!(!Dataset::verify(&json!({"path": {}})));
        assert!(!Dataset::verify(&json!({"path": "s3://x"})));
        assert!(!Dataset::verify(&json!({"path": {"a": "b"}, "meta": 3})));
    }

    #[test]
    fn collections_reject_empty_and_mixed() {
        assert!(Algorithms::verify(&json!([algorithm(), algorithm()])));
        assert!(!Algorithms::verify(&json!([])));
        assert!(!Algorithms::verify(&json!([algorithm(), dataset()])));
        assert!(!Experiments::verify(&json!([])));
    }

    #[test]
    fn experiment_ignores_extra_keys() {
        let value = json!({"algorithm": algorithm(), "dataset": dataset(), "note": "x"});
        let experiment = Experiment::try_from(value).unwrap();
        assert_eq!(
            serde_json::to_value(&experiment).unwrap(),
            json!({"algorithm": algorithm(), "dataset": dataset()})
        );
    }

    #[test]
    fn classification_miss_returns_the_input() {
        let value = json!({"algorithm": algorithm()});
        assert_eq!(Experiment::try_from(value.clone()), Err(value));
    }

    #[test]
    fn materialize_resolves_trial_references() {
        let algo = json!({
            "image": "img",
            "instance": "ml.m5.large",
            "hyperparameters": {
                "epochs": {"$eval": "__trial__.dataset.meta.size * 2"},
                "tag": {"$eval": "__trial__.algorithm.image + '-' + str(__trial__.dataset.meta.size)"},
            }
        });
        let experiment = Experiment::pair(
            Algorithm::try_from(algo).unwrap(),
            Dataset::try_from(dataset()).unwrap(),
        );
        let done = experiment.materialize(&Limits::default()).unwrap();
        assert_eq!(
            done.algorithm.hyperparameters(),
            json!({"epochs": 20, "tag": "img-10"}).as_object().cloned().unwrap()
        );
    }

    #[test]
    fn materialize_chains_pending_values() {
        let algo = json!({
            "image": "img",
            "instance": "x",
            "hyperparameters": {"double": {"$eval": "__trial__.algorithm.hyperparameters.base * 2"}, "base": 4}
        });
        let experiment = Experiment::pair(
            Algorithm::try_from(algo).unwrap(),
            Dataset::try_from(dataset()).unwrap(),
        );
        let done = experiment.materialize(&Limits::default()).unwrap();
        assert_eq!(done.algorithm.hyperparameters()["double"], json!(8));
    }
}
