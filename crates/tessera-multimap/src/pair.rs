//! Field map facade over [`PairBucket`].

use crate::access::{check_key, modify, read, update};
use crate::error::{require_all_non_null, require_non_null, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;
use tessera_core::error::{ERR_FIELD_CAN_T_BE_NULL, ERR_VALUE_CAN_T_BE_NULL};
use tessera_core::{Bucket, Element, Nullable, PairBucket};
use tessera_grid::{AtomicMap, GridKey};

/// Field maps stored in an [`AtomicMap`]. Fields and values share the type `V`.
pub struct PairCache<K, V, S> {
    store: S,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S> PairCache<K, V, S>
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

    async fn bucket(&self, key: &K) -> Result<Option<PairBucket<V, V>>> {
        check_key(key)?;
        read(&self.store, key).await
    }

    /// Upserts `entries`; returns how many fields were created.
    pub async fn set(&self, key: &K, entries: Vec<(V, V)>) -> Result<usize> {
        check_key(key)?;
        for (field, value) in &entries {
            require_non_null(field, ERR_FIELD_CAN_T_BE_NULL)?;
            require_non_null(value, ERR_VALUE_CAN_T_BE_NULL)?;
        }
        if entries.is_empty() {
            return Ok(0);
        }
        update(&self.store, key, move |current: Option<&PairBucket<V, V>>| {
            modify(current, |fields| {
                let before = fields.clone();
                let created = fields.set(entries.iter().cloned());
                Ok((*fields != before, created))
            })
        })
        .await
    }

    pub async fn get(&self, key: &K) -> Result<BTreeMap<V, V>> {
        Ok(self
            .bucket(key)
            .await?
            .map(|fields| fields.get())
            .unwrap_or_default())
    }

    pub async fn get_field(&self, key: &K, field: &V) -> Result<Option<V>> {
        require_non_null(field, ERR_FIELD_CAN_T_BE_NULL)?;
        Ok(self
            .bucket(key)
            .await?
            .and_then(|fields| fields.get_field(field).cloned()))
    }

    pub async fn size(&self, key: &K) -> Result<usize> {
        Ok(self.bucket(key).await?.map_or(0, |fields| fields.len()))
    }

    pub async fn key_set(&self, key: &K) -> Result<BTreeSet<V>> {
        Ok(self
            .bucket(key)
            .await?
            .map(|fields| fields.keys())
            .unwrap_or_default())
    }

    /// Values in field order.
    pub async fn values(&self, key: &K) -> Result<Vec<V>> {
        Ok(self
            .bucket(key)
            .await?
            .map(|fields| fields.values())
            .unwrap_or_default())
    }

    pub async fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.bucket(key).await?.is_some())
    }

    pub async fn contains_field(&self, key: &K, field: &V) -> Result<bool> {
        require_non_null(field, ERR_FIELD_CAN_T_BE_NULL)?;
        Ok(self
            .bucket(key)
            .await?
            .is_some_and(|fields| fields.contains_field(field)))
    }

    /// Removes `fields`; returns how many existed.
    pub async fn remove(&self, key: &K, fields: &[V]) -> Result<usize> {
        check_key(key)?;
        require_all_non_null(fields, ERR_FIELD_CAN_T_BE_NULL)?;
        let fields = fields.to_vec();
        update(&self.store, key, move |current: Option<&PairBucket<V, V>>| {
            modify(current, |map| {
                let removed = map.remove(&fields);
                Ok((removed > 0, removed))
            })
        })
        .await
    }
}

impl<K, V, S: Clone> Clone for PairCache<K, V, S> {
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

    fn cache() -> PairCache<String, String, GridNode<String, Bucket<String>>> {
        let grid = Grid::new(GridConfig::builder().nodes(2).build());
        PairCache::new(grid.nodes()[0].clone())
    }

    fn entry(field: &str, value: &str) -> (String, String) {
        (field.to_string(), value.to_string())
    }

    #[tokio::test]
    async fn test_remove_fields() {
        let cache = cache();
        let key = "p".to_string();
        cache.set(&key, vec![entry("a", "1"), entry("b", "2")]).await.unwrap();

        assert_eq!(cache.remove(&key, &["a".into(), "z".into()]).await.unwrap(), 1);
        assert!(!cache.contains_field(&key, &"a".into()).await.unwrap());
        assert_eq!(cache.values(&key).await.unwrap(), vec!["2"]);
        assert_eq!(cache.remove(&key, &["b".into()]).await.unwrap(), 1);
        assert!(!cache.contains_key(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_absent_key_reads() {
        let cache = cache();
        let key = "missing".to_string();
        assert!(cache.get(&key).await.unwrap().is_empty());
        assert_eq!(cache.get_field(&key, &"a".into()).await.unwrap(), None);
        assert_eq!(cache.size(&key).await.unwrap(), 0);
        assert!(cache.key_set(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_null_field_is_rejected() {
        let grid: Grid<String, Bucket<Option<String>>> = Grid::new(GridConfig::default());
        let cache = PairCache::new(grid.nodes()[0].clone());
        let err = cache
            .set(&"p".into(), vec![(None, Some("x".into()))])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "field can't be null");
    }
}
