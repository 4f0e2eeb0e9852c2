//! Set facade over [`SetBucket`].

use crate::access::{check_key, modify, read, update};
use crate::error::{require_all_non_null, require_non_null, Result};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use tessera_core::error::{ERR_VALUES_CAN_T_BE_NULL, ERR_VALUE_CAN_T_BE_NULL};
use tessera_core::{Bucket, Element, Nullable, SetBucket};
use tessera_grid::{AtomicMap, GridKey};

/// Sets of unique values stored in an [`AtomicMap`].
pub struct SetCache<K, V, S> {
    store: S,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S> SetCache<K, V, S>
where
    K: GridKey + Nullable,
    V: Element,
    S: AtomicMap<K, Bucket<V>>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn bucket(&self, key: &K) -> Result<Option<SetBucket<V>>> {
        check_key(key)?;
        read(&self.store, key).await
    }

    /// Returns `false` if `value` was already a member.
    pub async fn add(&self, key: &K, value: V) -> Result<bool> {
        check_key(key)?;
        require_non_null(&value, ERR_VALUE_CAN_T_BE_NULL)?;
        update(&self.store, key, move |current: Option<&SetBucket<V>>| {
            modify(current, |set| {
                let added = set.add(value.clone());
                Ok((added, added))
            })
        })
        .await
    }

    /// Adds every value and returns how many were new.
    pub async fn add_all(&self, key: &K, values: Vec<V>) -> Result<usize> {
        check_key(key)?;
        require_all_non_null(&values, ERR_VALUES_CAN_T_BE_NULL)?;
        update(&self.store, key, move |current: Option<&SetBucket<V>>| {
            modify(current, |set| {
                let added = set.add_all(values.iter().cloned());
                Ok((added > 0, added))
            })
        })
        .await
    }

    /// Replaces the whole membership and returns the new size.
    pub async fn set(&self, key: &K, values: Vec<V>) -> Result<usize> {
        check_key(key)?;
        require_all_non_null(&values, ERR_VALUES_CAN_T_BE_NULL)?;
        update(&self.store, key, move |current: Option<&SetBucket<V>>| {
            modify(current, |set| {
                let next: SetBucket<V> = values.iter().cloned().collect();
                let changed = *set != next;
                *set = next;
                Ok((changed, set.len()))
            })
        })
        .await
    }

    pub async fn remove(&self, key: &K, values: &[V]) -> Result<usize> {
        check_key(key)?;
        require_all_non_null(values, ERR_VALUES_CAN_T_BE_NULL)?;
        let values = values.to_vec();
        update(&self.store, key, move |current: Option<&SetBucket<V>>| {
            modify(current, |set| {
                let removed = set.remove(&values);
                Ok((removed > 0, removed))
            })
        })
        .await
    }

    pub async fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.bucket(key).await?.is_some())
    }

    pub async fn contains(&self, key: &K, value: &V) -> Result<bool> {
        require_non_null(value, ERR_VALUE_CAN_T_BE_NULL)?;
        Ok(self.bucket(key).await?.is_some_and(|set| set.contains(value)))
    }

    pub async fn size(&self, key: &K) -> Result<usize> {
        Ok(self.bucket(key).await?.map_or(0, |set| set.len()))
    }

    pub async fn get(&self, key: &K) -> Result<BTreeSet<V>> {
        Ok(self
            .bucket(key)
            .await?
            .map(|set| set.to_set())
            .unwrap_or_default())
    }
}

impl<K, V, S: Clone> Clone for SetCache<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_grid::{Grid, GridConfig, GridNode};

    fn cache() -> SetCache<String, i64, GridNode<String, Bucket<i64>>> {
        let grid = Grid::new(GridConfig::builder().nodes(2).build());
        SetCache::new(grid.nodes()[1].clone())
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let cache = cache();
        let key = "k".to_string();
        assert!(cache.add(&key, 7).await.unwrap());
        assert!(!cache.add(&key, 7).await.unwrap());
        assert_eq!(cache.size(&key).await.unwrap(), 1);
        assert!(cache.contains(&key, &7).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_replaces_membership() {
        let cache = cache();
        let key = "k".to_string();
        cache.add_all(&key, vec![1, 2, 3]).await.unwrap();
        assert_eq!(cache.set(&key, vec![3, 4, 4]).await.unwrap(), 2);
        assert_eq!(cache.get(&key).await.unwrap(), BTreeSet::from([3, 4]));

        assert_eq!(cache.set(&key, vec![]).await.unwrap(), 0);
        assert!(!cache.contains_key(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_counts_members() {
        let cache = cache();
        let key = "k".to_string();
        cache.add_all(&key, vec![1, 2, 3]).await.unwrap();
        assert_eq!(cache.remove(&key, &[2, 9]).await.unwrap(), 1);
        assert_eq!(cache.remove(&key, &[1, 3]).await.unwrap(), 2);
        assert!(cache.get(&key).await.unwrap().is_empty());
        assert!(!cache.contains_key(&key).await.unwrap());
    }
}
