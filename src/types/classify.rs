//! Shape-based recognition, tried in a fixed priority order.

use super::{Algorithm, Algorithms, Config, ConfigValue, Dataset, Datasets, Experiment, Experiments};
use crate::error::{Error, Result, kind_of};
use serde_json::Value;

/// First matching shape among Algorithm, Algorithms, Dataset, Datasets,
/// Experiment, Experiments; otherwise the value itself as `Plain`.
pub fn classify(value: Value) -> ConfigValue {
    let value = match Algorithm::try_from(value) {
        Ok(algorithm) => return ConfigValue::Algorithm(algorithm),
        Err(value) => value,
    };
    let value = match Algorithms::try_from(value) {
        Ok(algorithms) => return ConfigValue::Algorithms(algorithms),
        Err(value) => value,
    };
    let value = match Dataset::try_from(value) {
        Ok(dataset) => return ConfigValue::Dataset(dataset),
        Err(value) => value,
    };
    let value = match Datasets::try_from(value) {
        Ok(datasets) => return ConfigValue::Datasets(datasets),
        Err(value) => value,
    };
    let value = match Experiment::try_from(value) {
        Ok(experiment) => return ConfigValue::Experiment(experiment),
        Err(value) => value,
    };
    match Experiments::try_from(value) {
        Ok(experiments) => ConfigValue::Experiments(experiments),
        Err(value) => ConfigValue::Plain(value),
    }
}

/// Classify every top-level value of one concrete variant, keeping its keys.
pub fn classify_top_level(variant: Value) -> Result<Config> {
    match variant {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(key, value)| (key, classify(value)))
            .collect()),
        other => Err(Error::TopLevel {
            found: kind_of(&other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn algorithm() -> Value {
        json!({"image": "img", "instance": "ml.m5.large"})
    }

    fn dataset() -> Value {
        json!({"path": {"train": "s3://bucket/train"}})
    }

    #[test]
    fn shapes_are_recognized() {
        assert_eq!(classify(algorithm()).kind(), "an algorithm");
        assert_eq!(classify(json!([algorithm(), algorithm()])).kind(), "algorithms");
        assert_eq!(classify(dataset()).kind(), "a dataset");
        assert_eq!(classify(json!([dataset()])).kind(), "datasets");
        assert_eq!(
            classify(json!({"algorithm": algorithm(), "dataset": dataset()})).kind(),
            "an experiment"
        );
        assert_eq!(
            classify(json!([{"algorithm": algorithm(), "dataset": dataset()}])).kind(),
            "experiments"
        );
    }

    #[test]
    fn misses_are_plain() {
        assert_eq!(classify(json!(3)), ConfigValue::Plain(json!(3)));
        assert_eq!(classify(json!([])), ConfigValue::Plain(json!([])));
        assert_eq!(
            classify(json!({"image": "only"})),
            ConfigValue::Plain(json!({"image": "only"}))
        );
        assert_eq!(
            classify(json!([algorithm(), dataset()])),
            ConfigValue::Plain(json!([algorithm(), dataset()]))
        );
    }

    #[test]
    fn algorithm_wins_over_dataset() {
        let both = json!({"image": "i", "instance": "x", "path": {"a": "b"}});
        assert_eq!(classify(both).kind(), "an algorithm");
    }

    #[test]
    fn classification_is_idempotent() {
        let ConfigValue::Algorithm(first) = classify(algorithm()) else {
            panic!("expected an algorithm");
        };
        assert_eq!(classify(first.to_value()), ConfigValue::Algorithm(first));
    }

    #[test]
    fn top_level_must_be_a_map() {
        assert_eq!(
            classify_top_level(json!([1])),
            Err(Error::TopLevel { found: "a sequence" })
        );
        let config = classify_top_level(json!({"a": algorithm(), "n": 1})).unwrap();
        assert_eq!(config.keys().collect::<Vec<_>>(), vec!["a", "n"]);
    }
}
