//! List facade over [`SequenceBucket`].

use crate::access::{check_key, modify, read, update, Change};
use crate::error::{require_all_non_null, require_non_null, Result};
use std::marker::PhantomData;
use tessera_core::error::{
    ERR_ELEMENT_CAN_T_BE_NULL, ERR_PIVOT_CAN_T_BE_NULL, ERR_VALUES_CAN_T_BE_NULL,
    ERR_VALUE_CAN_T_BE_NULL,
};
use tessera_core::{Bucket, Element, IndexOfArgs, InsertOutcome, Nullable, SequenceBucket};
use tessera_grid::{AtomicMap, GridKey};

/// Lists stored in an [`AtomicMap`]. Duplicates are kept.
pub struct ListCache<K, V, S> {
    store: S,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S> ListCache<K, V, S>
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

    async fn bucket(&self, key: &K) -> Result<Option<SequenceBucket<V>>> {
        check_key(key)?;
        read(&self.store, key).await
    }

    async fn offer(&self, key: &K, value: V, first: bool) -> Result<()> {
        check_key(key)?;
        require_non_null(&value, ERR_VALUE_CAN_T_BE_NULL)?;
        update(&self.store, key, move |current: Option<&SequenceBucket<V>>| {
            modify(current, |list| {
                if first {
                    list.offer_first(value.clone());
                } else {
                    list.offer_last(value.clone());
                }
                Ok((true, ()))
            })
        })
        .await
    }

    async fn poll(&self, key: &K, count: usize, first: bool) -> Result<Vec<V>> {
        check_key(key)?;
        if count == 0 {
            return Ok(Vec::new());
        }
        update(&self.store, key, move |current: Option<&SequenceBucket<V>>| {
            modify(current, |list| {
                let polled = if first {
                    list.poll_first(count)
                } else {
                    list.poll_last(count)
                };
                Ok((!polled.is_empty(), polled))
            })
        })
        .await
    }

    // === Ends ===

    pub async fn offer_first(&self, key: &K, value: V) -> Result<()> {
        self.offer(key, value, true).await
    }

    pub async fn offer_last(&self, key: &K, value: V) -> Result<()> {
        self.offer(key, value, false).await
    }

    /// Removes up to `count` values from the head, in pop order.
    pub async fn poll_first(&self, key: &K, count: usize) -> Result<Vec<V>> {
        self.poll(key, count, true).await
    }

    /// Removes up to `count` values from the tail, in pop order.
    pub async fn poll_last(&self, key: &K, count: usize) -> Result<Vec<V>> {
        self.poll(key, count, false).await
    }

    // === Reads ===

    pub async fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.bucket(key).await?.is_some())
    }

    pub async fn size(&self, key: &K) -> Result<usize> {
        Ok(self.bucket(key).await?.map_or(0, |list| list.len()))
    }

    /// Value at `index`; negative indexes count from the tail.
    pub async fn index(&self, key: &K, index: i64) -> Result<Option<V>> {
        Ok(self
            .bucket(key)
            .await?
            .and_then(|list| list.index(index).cloned()))
    }

    /// Values in the inclusive range `[start, stop]`.
    pub async fn sub_list(&self, key: &K, start: i64, stop: i64) -> Result<Vec<V>> {
        Ok(self
            .bucket(key)
            .await?
            .map(|list| list.sub_list(start, stop))
            .unwrap_or_default())
    }

    /// Positions of `element`, ascending.
    pub async fn index_of(&self, key: &K, element: &V, args: &IndexOfArgs) -> Result<Vec<usize>> {
        require_non_null(element, ERR_ELEMENT_CAN_T_BE_NULL)?;
        Ok(self
            .bucket(key)
            .await?
            .map(|list| list.index_of(element, args))
            .unwrap_or_default())
    }

    // === Edits ===

    /// Replaces the value at `index`.
    ///
    /// Returns `false` when the key is absent; an out of range index is an error.
    pub async fn set(&self, key: &K, index: i64, value: V) -> Result<bool> {
        check_key(key)?;
        require_non_null(&value, ERR_VALUE_CAN_T_BE_NULL)?;
        update(&self.store, key, move |current: Option<&SequenceBucket<V>>| {
            if current.is_none() {
                return Ok((Change::Keep, false));
            }
            modify(current, |list| {
                list.set(index, value.clone())?;
                Ok((true, true))
            })
        })
        .await
    }

    /// Inserts `values` before or after the first occurrence of `pivot`.
    pub async fn insert(&self, key: &K, before: bool, pivot: V, values: Vec<V>) -> Result<InsertOutcome> {
        check_key(key)?;
        require_non_null(&pivot, ERR_PIVOT_CAN_T_BE_NULL)?;
        require_all_non_null(&values, ERR_VALUES_CAN_T_BE_NULL)?;
        update(&self.store, key, move |current: Option<&SequenceBucket<V>>| {
            if current.is_none() {
                return Ok((Change::Keep, InsertOutcome::NoSuchKey));
            }
            modify(current, |list| {
                let outcome = list.insert(before, &pivot, values.clone());
                Ok((matches!(outcome, InsertOutcome::Inserted(_)), outcome))
            })
        })
        .await
    }

    /// Removes occurrences of `element`; see [`SequenceBucket::remove`] for `count`.
    pub async fn remove(&self, key: &K, count: i64, element: V) -> Result<usize> {
        check_key(key)?;
        require_non_null(&element, ERR_ELEMENT_CAN_T_BE_NULL)?;
        update(&self.store, key, move |current: Option<&SequenceBucket<V>>| {
            modify(current, |list| {
                let removed = list.remove(count, &element);
                Ok((removed > 0, removed))
            })
        })
        .await
    }

    /// Keeps only `[start, stop]`. Returns `false` when the key is absent.
    pub async fn trim(&self, key: &K, start: i64, stop: i64) -> Result<bool> {
        check_key(key)?;
        update(&self.store, key, move |current: Option<&SequenceBucket<V>>| {
            if current.is_none() {
                return Ok((Change::Keep, false));
            }
            modify(current, |list| {
                let before = list.len();
                list.trim(start, stop);
                Ok((list.len() != before, true))
            })
        })
        .await
    }

    /// Moves one value between the ends and returns it.
    pub async fn rotate(&self, key: &K, pull_from_tail: bool) -> Result<Option<V>> {
        check_key(key)?;
        update(&self.store, key, move |current: Option<&SequenceBucket<V>>| {
            modify(current, |list| {
                let moved = list.rotate(pull_from_tail);
                Ok((moved.is_some(), moved))
            })
        })
        .await
    }

    /// Replaces the whole list and returns its new size. An empty list deletes the key.
    pub async fn replace(&self, key: &K, values: Vec<V>) -> Result<usize> {
        check_key(key)?;
        require_all_non_null(&values, ERR_VALUES_CAN_T_BE_NULL)?;
        update(&self.store, key, move |current: Option<&SequenceBucket<V>>| {
            modify(current, |list| {
                let before = list.clone();
                let len = list.replace(values.clone());
                Ok((*list != before, len))
            })
        })
        .await
    }
}

impl<K, V, S: Clone> Clone for ListCache<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}
