//! Pair bucket: a field map with last-write-wins on re-set.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Serialized as a sequence of `(field, value)` pairs so any field type round-trips.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "Vec<(F, V)>",
    into = "Vec<(F, V)>",
    bound(
        serialize = "F: Ord + Clone + Serialize, V: Clone + Serialize",
        deserialize = "F: Ord + Clone + Deserialize<'de>, V: Clone + Deserialize<'de>"
    )
)]
pub struct PairBucket<F: Ord + Clone, V: Clone> {
    fields: BTreeMap<F, V>,
}

impl<F: Ord + Clone, V: Clone> PairBucket<F, V> {
    pub fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Upserts `entries` and returns how many fields were created.
    pub fn set<I: IntoIterator<Item = (F, V)>>(&mut self, entries: I) -> usize {
        entries
            .into_iter()
            .filter(|(field, value)| self.fields.insert(field.clone(), value.clone()).is_none())
            .count()
    }

    pub fn get(&self) -> BTreeMap<F, V> {
        self.fields.clone()
    }

    pub fn get_field(&self, field: &F) -> Option<&V> {
        self.fields.get(field)
    }

    pub fn remove(&mut self, fields: &[F]) -> usize {
        fields
            .iter()
            .filter(|f| self.fields.remove(*f).is_some())
            .count()
    }

    pub fn contains_field(&self, field: &F) -> bool {
        self.fields.contains_key(field)
    }

    pub fn keys(&self) -> BTreeSet<F> {
        self.fields.keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.fields.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<F: Ord + Clone, V: Clone> Default for PairBucket<F, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Ord + Clone, V: Clone> From<Vec<(F, V)>> for PairBucket<F, V> {
    fn from(entries: Vec<(F, V)>) -> Self {
        Self {
            fields: entries.into_iter().collect(),
        }
    }
}

impl<F: Ord + Clone, V: Clone> From<PairBucket<F, V>> for Vec<(F, V)> {
    fn from(bucket: PairBucket<F, V>) -> Self {
        bucket.fields.into_iter().collect()
    }
}
