//! Folding classified variants back into one [`Config`].

use crate::tree::Versions;
use crate::types::{Config, ConfigValue};

/// Per key: the value itself if every variant agrees, otherwise the
/// distinct values as an alternative set in first-seen order.
pub fn merge_versions(variants: impl IntoIterator<Item = Config>) -> Config {
    let mut seen: Vec<(String, Vec<ConfigValue>)> = Vec::new();
    for variant in variants {
        for (key, value) in variant {
            match seen.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => {
                    if !values.contains(&value) {
                        values.push(value);
                    }
                }
                None => seen.push((key, vec![value])),
            }
        }
    }

    seen.into_iter()
        .filter_map(|(key, values)| {
            let merged = if values.len() == 1 {
                values.into_iter().next()?
            } else {
                ConfigValue::Versions(Versions::new(values)?)
            };
            Some((key, merged))
        })
        .collect()
}
