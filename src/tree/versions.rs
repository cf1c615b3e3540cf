//! Alternative sets: several concrete values standing in for one slot.

use serde::Serialize;

/// Ordered, non-empty list of alternatives.
///
/// Equality is element-wise and order-sensitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Versions<T>(Vec<T>);

impl<T> Versions<T> {
    /// `None` if `items` is empty.
    pub fn new(items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            None
        } else {
            Some(Self(items))
        }
    }

    /// Caller guarantees `items` is non-empty (e.g. a product of non-empty sets).
    pub(crate) fn from_nonempty(items: Vec<T>) -> Self {
        debug_assert!(!items.is_empty());
        Self(items)
    }

    pub fn single(item: T) -> Self {
        Self(vec![item])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<T> {
        self.0
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Versions<U> {
        Versions(self.0.into_iter().map(f).collect())
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Versions<U>, E> {
        Ok(Versions(self.0.into_iter().map(f).collect::<Result<_, _>>()?))
    }
}

impl<T> IntoIterator for Versions<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Versions<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Cartesian product in row-major order: the first set varies slowest,
/// the last set fastest.
pub fn product<T: Clone>(sets: &[&Versions<T>]) -> Vec<Vec<T>> {
    let total: usize = sets.iter().map(|s| s.len()).product();
    let mut out = Vec::with_capacity(total);
    let mut cursor = vec![0usize; sets.len()];
    for _ in 0..total {
        out.push(
            sets.iter()
                .zip(&cursor)
                .map(|(set, &idx)| set.as_slice()[idx].clone())
                .collect(),
        );
        // Odometer increment from the last position.
        for pos in (0..sets.len()).rev() {
            cursor[pos] += 1;
            if cursor[pos] < sets[pos].len() {
                break;
            }
            cursor[pos] = 0;
        }
    }
    out
}
