//! Set bucket: unique values, re-adding is a no-op.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetBucket<V: Ord> {
    values: BTreeSet<V>,
}

impl<V: Ord + Clone> SetBucket<V> {
    pub fn new() -> Self {
        Self {
            values: BTreeSet::new(),
        }
    }

    /// Returns `false` if `value` was already present.
    pub fn add(&mut self, value: V) -> bool {
        self.values.insert(value)
    }

    /// Returns how many of `values` were new.
    pub fn add_all<I: IntoIterator<Item = V>>(&mut self, values: I) -> usize {
        values.into_iter().filter(|v| self.values.insert(v.clone())).count()
    }

    pub fn remove(&mut self, values: &[V]) -> usize {
        values.iter().filter(|v| self.values.remove(*v)).count()
    }

    pub fn contains(&self, value: &V) -> bool {
        self.values.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &V> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_set(&self) -> BTreeSet<V> {
        self.values.clone()
    }
}

impl<V: Ord + Clone> Default for SetBucket<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Ord + Clone> FromIterator<V> for SetBucket<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut set = SetBucket::new();
        assert!(set.add("koldo"));
        assert!(!set.add("koldo"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_add_all_counts_new() {
        let mut set: SetBucket<i32> = [1, 2].into_iter().collect();
        assert_eq!(set.add_all(vec![2, 3, 3, 4]), 2);
        assert_eq!(set.to_set(), [1, 2, 3, 4].into_iter().collect());
    }

    #[test]
    fn test_remove() {
        let mut set: SetBucket<i32> = [1, 2, 3].into_iter().collect();
        assert_eq!(set.remove(&[1, 3, 5]), 2);
        assert!(set.contains(&2));
        assert!(!set.contains(&1));
    }
}
