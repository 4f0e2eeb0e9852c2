//! Multi-valued map: every key holds a collection of values.
//!
//! [`DuplicatePolicy::RejectDuplicates`] keeps a [`SetBucket`] per key, so equal
//! values collapse. [`DuplicatePolicy::AllowDuplicates`] keeps a
//! [`SequenceBucket`] and stores every `put`.
//!
//! Which stored values match a given value for `remove`, `contains_value` and
//! `contains_entry` is decided by a [`ValueEquivalence`]. [`ByContent`] uses
//! `==`; [`ByContentAndKind`] also requires the same [`Kinded::kind`], so two
//! values with equal content but different declared kinds stay distinct.

use crate::access::{check_key, modify, read, update, Change};
use crate::error::{require_non_null, MultimapError, Result};
use futures::future::join_all;
use std::marker::PhantomData;
use std::sync::Arc;
use tessera_core::error::ERR_VALUE_CAN_T_BE_NULL;
use tessera_core::{Bucket, BucketVariant, Element, Nullable, SequenceBucket, SetBucket};
use tessera_grid::{AtomicMap, GridKey};
use tracing::debug;

/// How a key treats a value equal to one it already holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DuplicatePolicy {
    #[default]
    RejectDuplicates,
    AllowDuplicates,
}

/// A value that declares which kind of thing it is.
pub trait Kinded {
    fn kind(&self) -> &'static str;
}

/// Decides whether a stored value matches a probe value.
pub trait ValueEquivalence<V>: Clone + Send + Sync + 'static {
    fn equivalent(&self, stored: &V, probe: &V) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ByContent;

impl<V: PartialEq> ValueEquivalence<V> for ByContent {
    fn equivalent(&self, stored: &V, probe: &V) -> bool {
        stored == probe
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ByContentAndKind;

impl<V: PartialEq + Kinded> ValueEquivalence<V> for ByContentAndKind {
    fn equivalent(&self, stored: &V, probe: &V) -> bool {
        stored == probe && stored.kind() == probe.kind()
    }
}

/// The two collections a multimap key can hold.
trait Values<V: Element>: BucketVariant<V> + FromIterator<V> {
    fn push(&mut self, value: V) -> bool;

    fn to_values(&self) -> Vec<V>;
}

impl<V: Element> Values<V> for SetBucket<V> {
    fn push(&mut self, value: V) -> bool {
        self.add(value)
    }

    fn to_values(&self) -> Vec<V> {
        self.iter().cloned().collect()
    }
}

impl<V: Element> Values<V> for SequenceBucket<V> {
    fn push(&mut self, value: V) -> bool {
        self.offer_last(value);
        true
    }

    fn to_values(&self) -> Vec<V> {
        self.to_vec()
    }
}

/// Selects values to drop.
type Matcher<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

macro_rules! by_policy {
    ($self:ident . $method:ident ( $($arg:expr),* )) => {
        match $self.policy {
            DuplicatePolicy::RejectDuplicates => $self.$method::<SetBucket<V>>($($arg),*).await,
            DuplicatePolicy::AllowDuplicates => $self.$method::<SequenceBucket<V>>($($arg),*).await,
        }
    };
}

pub struct MultimapCache<K, V, S, E = ByContent> {
    store: S,
    policy: DuplicatePolicy,
    equivalence: E,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S> MultimapCache<K, V, S, ByContent>
where
    K: GridKey + Nullable,
    V: Element,
    S: AtomicMap<K, Bucket<V>>,
{
    pub fn new(store: S, policy: DuplicatePolicy) -> Self {
        Self::with_equivalence(store, policy, ByContent)
    }
}

impl<K, V, S, E> MultimapCache<K, V, S, E>
where
    K: GridKey + Nullable,
    V: Element,
    S: AtomicMap<K, Bucket<V>>,
    E: ValueEquivalence<V>,
{
    pub fn with_equivalence(store: S, policy: DuplicatePolicy, equivalence: E) -> Self {
        Self {
            store,
            policy,
            equivalence,
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn supports_duplicates(&self) -> bool {
        self.policy == DuplicatePolicy::AllowDuplicates
    }

    // === Writes ===

    pub async fn put(&self, key: &K, value: V) -> Result<()> {
        check_key(key)?;
        require_non_null(&value, ERR_VALUE_CAN_T_BE_NULL)?;
        by_policy!(self.put_in(key, value))
    }

    /// Removes every value under `key` equivalent to `value`.
    pub async fn remove(&self, key: &K, value: &V) -> Result<bool> {
        check_key(key)?;
        require_non_null(value, ERR_VALUE_CAN_T_BE_NULL)?;
        let probe = value.clone();
        let equivalence = self.equivalence.clone();
        let matches: Matcher<V> = Arc::new(move |stored: &V| equivalence.equivalent(stored, &probe));
        Ok(by_policy!(self.retain_in(key, matches))? > 0)
    }

    /// Removes the key and all its values.
    pub async fn remove_key(&self, key: &K) -> Result<bool> {
        check_key(key)?;
        by_policy!(self.clear_in(key))
    }

    /// Removes every value, under any key, that matches `predicate`.
    ///
    /// Keys holding other bucket kinds are skipped. Returns the number of
    /// values removed.
    pub async fn remove_if<P>(&self, predicate: P) -> Result<usize>
    where
        P: Fn(&V) -> bool + Send + Sync + 'static,
    {
        let predicate: Matcher<V> = Arc::new(predicate);
        let mut removed = 0;
        for key in self.store.keys().await? {
            let outcome = by_policy!(self.retain_in(&key, predicate.clone()));
            match outcome {
                Ok(n) => removed += n,
                Err(MultimapError::WrongBucketKind { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        debug!(removed, "multimap remove_if");
        Ok(removed)
    }

    // === Reads ===

    /// Values under `key`: ordered for rejecting maps, insertion order otherwise.
    pub async fn get(&self, key: &K) -> Result<Vec<V>> {
        check_key(key)?;
        by_policy!(self.values_in(key))
    }

    pub async fn get_entry(&self, key: &K) -> Result<Option<(K, Vec<V>)>> {
        let values = self.get(key).await?;
        Ok((!values.is_empty()).then(|| (key.clone(), values)))
    }

    pub async fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(!self.get(key).await?.is_empty())
    }

    pub async fn contains_entry(&self, key: &K, value: &V) -> Result<bool> {
        require_non_null(value, ERR_VALUE_CAN_T_BE_NULL)?;
        let values = self.get(key).await?;
        Ok(values.iter().any(|stored| self.equivalence.equivalent(stored, value)))
    }

    /// Whether any key holds a value equivalent to `value`.
    pub async fn contains_value(&self, value: &V) -> Result<bool> {
        require_non_null(value, ERR_VALUE_CAN_T_BE_NULL)?;
        let all = self.all_values().await?;
        Ok(all
            .iter()
            .flatten()
            .any(|stored| self.equivalence.equivalent(stored, value)))
    }

    /// Number of values across every key.
    pub async fn size(&self) -> Result<usize> {
        Ok(self.all_values().await?.iter().map(Vec::len).sum())
    }

    async fn all_values(&self) -> Result<Vec<Vec<V>>> {
        let keys = self.store.keys().await?;
        let reads = join_all(keys.iter().map(|key| async move { by_policy!(self.values_in(key)) })).await;
        let mut all = Vec::with_capacity(reads.len());
        for result in reads {
            match result {
                Ok(values) => all.push(values),
                Err(MultimapError::WrongBucketKind { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(all)
    }

    // === Per-collection helpers ===

    async fn put_in<B: Values<V>>(&self, key: &K, value: V) -> Result<()> {
        update(&self.store, key, move |current: Option<&B>| {
            modify(current, |values| Ok((values.push(value.clone()), ())))
        })
        .await
    }

    async fn retain_in<B: Values<V>>(&self, key: &K, remove: Matcher<V>) -> Result<usize> {
        update(&self.store, key, move |current: Option<&B>| {
            let Some(current) = current else {
                return Ok((Change::Keep, 0));
            };
            let values = current.to_values();
            let kept: Vec<V> = values.iter().filter(|v| !remove(*v)).cloned().collect();
            let removed = values.len() - kept.len();
            if removed == 0 {
                return Ok((Change::Keep, 0));
            }
            Ok((Change::Replace(kept.into_iter().collect()), removed))
        })
        .await
    }

    async fn clear_in<B: Values<V>>(&self, key: &K) -> Result<bool> {
        update(&self.store, key, |current: Option<&B>| {
            Ok(match current {
                Some(_) => (Change::Replace(B::default()), true),
                None => (Change::Keep, false),
            })
        })
        .await
    }

    async fn values_in<B: Values<V>>(&self, key: &K) -> Result<Vec<V>> {
        Ok(read::<K, V, S, B>(&self.store, key)
            .await?
            .map(|values| values.to_values())
            .unwrap_or_default())
    }
}

impl<K, V, S: Clone, E: Clone> Clone for MultimapCache<K, V, S, E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
            equivalence: self.equivalence.clone(),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_grid::{Grid, GridConfig, GridNode};

    fn multimap(policy: DuplicatePolicy) -> MultimapCache<String, String, GridNode<String, Bucket<String>>> {
        let grid = Grid::new(GridConfig::builder().nodes(2).build());
        MultimapCache::new(grid.nodes()[0].clone(), policy)
    }

    #[tokio::test]
    async fn test_reject_duplicates_collapses_values() {
        let map = multimap(DuplicatePolicy::RejectDuplicates);
        let key = "k".to_string();
        map.put(&key, "a".into()).await.unwrap();
        map.put(&key, "a".into()).await.unwrap();
        map.put(&key, "b".into()).await.unwrap();

        assert!(!map.supports_duplicates());
        assert_eq!(map.get(&key).await.unwrap(), vec!["a", "b"]);
        assert_eq!(map.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_allow_duplicates_keeps_every_put() {
        let map = multimap(DuplicatePolicy::AllowDuplicates);
        let key = "k".to_string();
        for v in ["b", "a", "b"] {
            map.put(&key, v.into()).await.unwrap();
        }
        assert!(map.supports_duplicates());
        assert_eq!(map.get(&key).await.unwrap(), vec!["b", "a", "b"]);

        assert!(map.remove(&key, &"b".into()).await.unwrap());
        assert_eq!(map.get(&key).await.unwrap(), vec!["a"]);
        assert!(!map.remove(&key, &"b".into()).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_key_and_get_entry() {
        let map = multimap(DuplicatePolicy::RejectDuplicates);
        let key = "k".to_string();
        assert_eq!(map.get_entry(&key).await.unwrap(), None);
        map.put(&key, "a".into()).await.unwrap();
        assert_eq!(map.get_entry(&key).await.unwrap(), Some((key.clone(), vec!["a".to_string()])));

        assert!(map.remove_key(&key).await.unwrap());
        assert!(!map.remove_key(&key).await.unwrap());
        assert!(!map.contains_key(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_if_spans_keys() {
        let map = multimap(DuplicatePolicy::AllowDuplicates);
        for (k, v) in [("k1", "apple"), ("k1", "pear"), ("k2", "avocado"), ("k3", "plum")] {
            map.put(&k.to_string(), v.to_string()).await.unwrap();
        }

        let removed = map.remove_if(|v: &String| v.starts_with('a')).await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(map.get(&"k1".into()).await.unwrap(), vec!["pear"]);
        assert!(!map.contains_key(&"k2".into()).await.unwrap());
        assert_eq!(map.size().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_contains_value_and_entry() {
        let map = multimap(DuplicatePolicy::RejectDuplicates);
        map.put(&"k1".into(), "a".into()).await.unwrap();
        map.put(&"k2".into(), "b".into()).await.unwrap();

        assert!(map.contains_value(&"b".into()).await.unwrap());
        assert!(!map.contains_value(&"c".into()).await.unwrap());
        assert!(map.contains_entry(&"k1".into(), &"a".into()).await.unwrap());
        assert!(!map.contains_entry(&"k1".into(), &"b".into()).await.unwrap());
    }
}
