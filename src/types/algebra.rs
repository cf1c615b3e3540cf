//! Grouping (`combine`) and pairing (`cross`) of classified values.
//!
//! | left \ right | Algorithm(s)        | Dataset(s)          | Experiment(s) |
//! |--------------|---------------------|---------------------|---------------|
//! | Algorithm(s) | combine: Algorithms | cross: Experiment(s)| error         |
//! | Dataset(s)   | cross: Experiment(s)| combine: Datasets   | error         |
//!
//! Crossing iterates the left operand as the outer loop. Alternative sets
//! on either side are crossed alternative by alternative.

use super::{Algorithm, Algorithms, ConfigValue, Dataset, Datasets, Experiment, Experiments};
use crate::error::{Error, Result};

fn algebra_error(op: &'static str, left: &ConfigValue, right: &ConfigValue) -> Error {
    Error::AlgebraType {
        op,
        left: left.kind(),
        right: right.kind(),
    }
}

/// One side of a cross: every algorithm or every dataset it stands for.
enum Side<'a> {
    Algorithms(Vec<&'a Algorithm>),
    Datasets(Vec<&'a Dataset>),
}

impl<'a> Side<'a> {
    fn of(value: &'a ConfigValue) -> Option<Side<'a>> {
        match value {
            ConfigValue::Algorithm(algorithm) => Some(Side::Algorithms(vec![algorithm])),
            ConfigValue::Algorithms(items) => Some(Side::Algorithms(items.iter().collect())),
            ConfigValue::Dataset(dataset) => Some(Side::Datasets(vec![dataset])),
            ConfigValue::Datasets(items) => Some(Side::Datasets(items.iter().collect())),
            _ => None,
        }
    }
}

impl ConfigValue {
    /// Group values of the same kind into a collection, left operand first.
    pub fn combine(self, other: ConfigValue) -> Result<ConfigValue> {
        use ConfigValue as V;
        Ok(match (self, other) {
            (V::Algorithm(a), V::Algorithm(b)) => V::Algorithms(Algorithms::from_vec(vec![a, b])),
            (V::Algorithm(a), V::Algorithms(rest)) => {
                V::Algorithms(Algorithms::from_vec(prepend(a, rest.into_vec())))
            }
            (V::Algorithms(items), V::Algorithm(b)) => {
                V::Algorithms(Algorithms::from_vec(append(items.into_vec(), b)))
            }
            (V::Algorithms(a), V::Algorithms(b)) => {
                V::Algorithms(Algorithms::from_vec(concat(a.into_vec(), b.into_vec())))
            }
            (V::Dataset(a), V::Dataset(b)) => V::Datasets(Datasets::from_vec(vec![a, b])),
            (V::Dataset(a), V::Datasets(rest)) => {
                V::Datasets(Datasets::from_vec(prepend(a, rest.into_vec())))
            }
            (V::Datasets(items), V::Dataset(b)) => {
                V::Datasets(Datasets::from_vec(append(items.into_vec(), b)))
            }
            (V::Datasets(a), V::Datasets(b)) => {
                V::Datasets(Datasets::from_vec(concat(a.into_vec(), b.into_vec())))
            }
            (V::Experiments(a), V::Experiments(b)) => {
                V::Experiments(Experiments::from_vec(concat(a.into_vec(), b.into_vec())))
            }
            (left, right) => return Err(algebra_error("combine", &left, &right)),
        })
    }

    /// Pair algorithms with datasets.
    ///
    /// A single algorithm and a single dataset give one [`Experiment`];
    /// anything involving a collection or an alternative set gives
    /// [`Experiments`] with the left operand as the outer loop.
    pub fn cross(&self, other: &ConfigValue) -> Result<ConfigValue> {
        use ConfigValue as V;
        match (self, other) {
            (V::Algorithm(a), V::Dataset(d)) | (V::Dataset(d), V::Algorithm(a)) => {
                Ok(V::Experiment(Experiment::pair(a.clone(), d.clone())))
            }
            (left, right) => {
                let mut out = Vec::new();
                pairs(left, right, &mut out)?;
                Ok(V::Experiments(Experiments::from_vec(out)))
            }
        }
    }
}

fn pairs(left: &ConfigValue, right: &ConfigValue, out: &mut Vec<Experiment>) -> Result<()> {
    if let ConfigValue::Versions(lefts) = left {
        for alternative in lefts {
            pairs(alternative, right, out)?;
        }
        return Ok(());
    }
    if let ConfigValue::Versions(rights) = right {
        for alternative in rights {
            pairs(left, alternative, out)?;
        }
        return Ok(());
    }

    match (Side::of(left), Side::of(right)) {
        (Some(Side::Algorithms(algorithms)), Some(Side::Datasets(datasets))) => {
            for algorithm in algorithms {
                for dataset in &datasets {
                    out.push(Experiment::pair(algorithm.clone(), (*dataset).clone()));
                }
            }
        }
        (Some(Side::Datasets(datasets)), Some(Side::Algorithms(algorithms))) => {
            for dataset in datasets {
                for algorithm in &algorithms {
                    out.push(Experiment::pair((*algorithm).clone(), dataset.clone()));
                }
            }
        }
        _ => return Err(algebra_error("cross", left, right)),
    }
    Ok(())
}

fn prepend<T>(first: T, mut rest: Vec<T>) -> Vec<T> {
    rest.insert(0, first);
    rest
}

fn append<T>(mut items: Vec<T>, last: T) -> Vec<T> {
    items.push(last);
    items
}

fn concat<T>(mut left: Vec<T>, right: Vec<T>) -> Vec<T> {
    left.extend(right);
    left
}
