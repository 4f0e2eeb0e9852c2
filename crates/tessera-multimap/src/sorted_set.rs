//! Sorted set facade.
//!
//! Each key holds a [`SortedSetBucket`]: unique values ordered by score, ties
//! broken by the value's own order.

use crate::access::{check_key, modify, read, update};
use crate::error::{require_all_non_null, require_non_null, MultimapError, Result};
use futures::future::try_join_all;
use std::marker::PhantomData;
use tessera_core::error::{
    ERR_ARGS_INDEXES_CAN_T_BE_NULL, ERR_MEMBERS_CAN_T_BE_NULL, ERR_MEMBER_CAN_T_BE_NULL,
    ERR_SCORES_CAN_T_BE_NULL, ERR_SCORES_VALUES_MUST_HAVE_SAME_SIZE, ERR_VALUES_CAN_T_BE_NULL,
    ERR_WEIGHTS_KEYS_MUST_HAVE_SAME_SIZE,
};
use tessera_core::range::bound;
use tessera_core::{
    AggregateFunction, AggregateKind, Bucket, BucketError, Element, Nullable, ScoredValue,
    SortedSetAddArgs, SortedSetBucket, SortedSetSubsetArgs,
};
use tessera_grid::{AtomicMap, GridKey};
use tracing::debug;

fn check_score(score: Option<f64>) -> Result<()> {
    match score {
        Some(s) if s.is_nan() => Err(BucketError::NotANumber.into()),
        _ => Ok(()),
    }
}

/// Sorted sets stored in an [`AtomicMap`].
pub struct SortedSetCache<K, V, S> {
    store: S,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S> SortedSetCache<K, V, S>
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

    async fn bucket(&self, key: &K) -> Result<Option<SortedSetBucket<V>>> {
        check_key(key)?;
        read(&self.store, key).await
    }

    // === Adding ===

    /// Adds `values` with the matching `scores`.
    ///
    /// Scores are plain `f64`s, or `Option<f64>` where `None` is a null score.
    /// Returns the number of created values, or created plus updated values
    /// when `args.return_changed_count` is set.
    pub async fn add_many<Sc>(
        &self,
        key: &K,
        scores: &[Sc],
        values: &[V],
        args: SortedSetAddArgs,
    ) -> Result<usize>
    where
        Sc: Copy + Into<Option<f64>>,
    {
        check_key(key)?;
        let scores = scores
            .iter()
            .map(|s| (*s).into())
            .collect::<Option<Vec<f64>>>()
            .ok_or(MultimapError::NullArgument(ERR_SCORES_CAN_T_BE_NULL))?;
        require_all_non_null(values, ERR_VALUES_CAN_T_BE_NULL)?;
        if scores.len() != values.len() {
            return Err(MultimapError::IllegalArgument(
                ERR_SCORES_VALUES_MUST_HAVE_SAME_SIZE.to_string(),
            ));
        }
        if scores.iter().any(|s| s.is_nan()) {
            return Err(BucketError::NotANumber.into());
        }
        if values.is_empty() {
            return Ok(0);
        }

        let items: Vec<ScoredValue<V>> = scores
            .into_iter()
            .zip(values)
            .map(|(score, value)| ScoredValue::new(score, value.clone()))
            .collect();
        debug!(?key, count = items.len(), "sorted set add");
        update(&self.store, key, move |current: Option<&SortedSetBucket<V>>| {
            modify(current, |set| {
                let before = set.clone();
                let changed = set.add_many(items.clone(), &args)?;
                Ok((*set != before, changed))
            })
        })
        .await
    }

    /// Adds `delta` to the score of `member`; an absent member starts at 0.
    ///
    /// Returns `None` when `args` prevents the write.
    pub async fn increment_score(
        &self,
        key: &K,
        member: V,
        delta: f64,
        args: SortedSetAddArgs,
    ) -> Result<Option<f64>> {
        check_key(key)?;
        require_non_null(&member, ERR_MEMBER_CAN_T_BE_NULL)?;
        check_score(Some(delta))?;
        update(&self.store, key, move |current: Option<&SortedSetBucket<V>>| {
            modify(current, |set| {
                let score = set.increment_score(member.clone(), delta, &args)?;
                Ok((score.is_some(), score))
            })
        })
        .await
    }

    // === Reads ===

    pub async fn contains_key(&self, key: &K) -> Result<bool> {
        Ok(self.bucket(key).await?.is_some())
    }

    pub async fn size(&self, key: &K) -> Result<usize> {
        Ok(self.bucket(key).await?.map_or(0, |set| set.len()))
    }

    /// Every element in canonical order.
    pub async fn get(&self, key: &K) -> Result<Vec<ScoredValue<V>>> {
        Ok(self.bucket(key).await?.map(|set| set.to_vec()).unwrap_or_default())
    }

    pub async fn score(&self, key: &K, member: &V) -> Result<Option<f64>> {
        require_non_null(member, ERR_MEMBER_CAN_T_BE_NULL)?;
        Ok(self.bucket(key).await?.and_then(|set| set.score(member)))
    }

    /// Scores of `members` in the same order; missing members map to `None`.
    pub async fn scores(&self, key: &K, members: &[V]) -> Result<Vec<Option<f64>>> {
        require_all_non_null(members, ERR_MEMBERS_CAN_T_BE_NULL)?;
        Ok(match self.bucket(key).await? {
            Some(set) => set.scores(members),
            None => vec![None; members.len()],
        })
    }

    /// Number of elements whose score lies in the range. A `None` bound is unbounded.
    pub async fn count(
        &self,
        key: &K,
        min: Option<f64>,
        include_min: bool,
        max: Option<f64>,
        include_max: bool,
    ) -> Result<usize> {
        check_score(min)?;
        check_score(max)?;
        Ok(self.bucket(key).await?.map_or(0, |set| {
            set.count_by_score(bound(min, include_min), bound(max, include_max))
        }))
    }

    /// Number of elements whose value lies in the range.
    pub async fn count_by_lex(
        &self,
        key: &K,
        min: Option<V>,
        include_min: bool,
        max: Option<V>,
        include_max: bool,
    ) -> Result<usize> {
        Ok(self.bucket(key).await?.map_or(0, |set| {
            set.count_by_lex(bound(min.as_ref(), include_min), bound(max.as_ref(), include_max))
        }))
    }

    /// Elements by rank. Both `start` and `stop` are required; ranks are inclusive.
    pub async fn subset_by_index(
        &self,
        key: &K,
        args: &SortedSetSubsetArgs<i64>,
    ) -> Result<Vec<ScoredValue<V>>> {
        let (Some(start), Some(stop)) = (args.start, args.stop) else {
            return Err(MultimapError::NullArgument(ERR_ARGS_INDEXES_CAN_T_BE_NULL));
        };
        Ok(self
            .bucket(key)
            .await?
            .map(|set| set.subset_by_index(start, stop, args.is_rev))
            .unwrap_or_default())
    }

    pub async fn subset_by_score(
        &self,
        key: &K,
        args: &SortedSetSubsetArgs<f64>,
    ) -> Result<Vec<ScoredValue<V>>> {
        check_score(args.start)?;
        check_score(args.stop)?;
        Ok(self
            .bucket(key)
            .await?
            .map(|set| set.subset_by_score(args))
            .unwrap_or_default())
    }

    /// Elements by value range. Meaningful when every element shares one score.
    pub async fn subset_by_lex(
        &self,
        key: &K,
        args: &SortedSetSubsetArgs<V>,
    ) -> Result<Vec<ScoredValue<V>>> {
        Ok(self
            .bucket(key)
            .await?
            .map(|set| set.subset_by_lex(args))
            .unwrap_or_default())
    }

    /// Rank and score of `member`, counted from the highest score when `is_rev`.
    pub async fn index_of(&self, key: &K, member: &V, is_rev: bool) -> Result<Option<(usize, f64)>> {
        require_non_null(member, ERR_MEMBER_CAN_T_BE_NULL)?;
        Ok(self.bucket(key).await?.and_then(|set| set.index_of(member, is_rev)))
    }

    /// Up to `count` elements. A negative count may repeat elements.
    pub async fn random_members(&self, key: &K, count: i64) -> Result<Vec<ScoredValue<V>>> {
        Ok(match self.bucket(key).await? {
            Some(set) => set.random_members(count, &mut rand::thread_rng()),
            None => Vec::new(),
        })
    }

    // === Removal ===

    pub async fn remove_all(&self, key: &K, values: &[V]) -> Result<usize> {
        check_key(key)?;
        require_all_non_null(values, ERR_VALUES_CAN_T_BE_NULL)?;
        let values = values.to_vec();
        update(&self.store, key, move |current: Option<&SortedSetBucket<V>>| {
            modify(current, |set| {
                let removed = set.remove_values(&values);
                Ok((removed > 0, removed))
            })
        })
        .await
    }

    /// Removes elements by inclusive rank range. A `None` bound is unbounded.
    pub async fn remove_by_rank(&self, key: &K, start: Option<i64>, stop: Option<i64>) -> Result<usize> {
        check_key(key)?;
        let start = start.unwrap_or(0);
        let stop = stop.unwrap_or(-1);
        update(&self.store, key, move |current: Option<&SortedSetBucket<V>>| {
            modify(current, |set| {
                let removed = set.remove_by_rank(start, stop);
                Ok((removed > 0, removed))
            })
        })
        .await
    }

    pub async fn remove_by_score(
        &self,
        key: &K,
        min: Option<f64>,
        include_min: bool,
        max: Option<f64>,
        include_max: bool,
    ) -> Result<usize> {
        check_key(key)?;
        check_score(min)?;
        check_score(max)?;
        update(&self.store, key, move |current: Option<&SortedSetBucket<V>>| {
            modify(current, |set| {
                let removed = set.remove_by_score(bound(min, include_min), bound(max, include_max));
                Ok((removed > 0, removed))
            })
        })
        .await
    }

    pub async fn remove_by_lex(
        &self,
        key: &K,
        min: Option<V>,
        include_min: bool,
        max: Option<V>,
        include_max: bool,
    ) -> Result<usize> {
        check_key(key)?;
        update(&self.store, key, move |current: Option<&SortedSetBucket<V>>| {
            modify(current, |set| {
                let removed = set.remove_by_lex(
                    bound(min.as_ref(), include_min),
                    bound(max.as_ref(), include_max),
                );
                Ok((removed > 0, removed))
            })
        })
        .await
    }

    /// Removes and returns up to `count` elements from the low end (`from_min`) or the high end.
    pub async fn pop(&self, key: &K, from_min: bool, count: usize) -> Result<Vec<ScoredValue<V>>> {
        check_key(key)?;
        update(&self.store, key, move |current: Option<&SortedSetBucket<V>>| {
            modify(current, |set| {
                let popped = set.pop(from_min, count);
                Ok((!popped.is_empty(), popped))
            })
        })
        .await
    }

    // === Aggregation ===

    /// Weighted union of the sets under `keys`. Nothing is stored.
    pub async fn union(
        &self,
        keys: &[K],
        weights: Option<&[f64]>,
        function: AggregateFunction,
    ) -> Result<Vec<ScoredValue<V>>> {
        self.aggregate(AggregateKind::Union, keys, weights, function).await
    }

    /// Weighted intersection of the sets under `keys`. Nothing is stored.
    pub async fn inter(
        &self,
        keys: &[K],
        weights: Option<&[f64]>,
        function: AggregateFunction,
    ) -> Result<Vec<ScoredValue<V>>> {
        self.aggregate(AggregateKind::Inter, keys, weights, function).await
    }

    async fn aggregate(
        &self,
        kind: AggregateKind,
        keys: &[K],
        weights: Option<&[f64]>,
        function: AggregateFunction,
    ) -> Result<Vec<ScoredValue<V>>> {
        for key in keys {
            check_key(key)?;
        }
        let weights = match weights {
            Some(w) if w.len() != keys.len() => {
                return Err(MultimapError::IllegalArgument(
                    ERR_WEIGHTS_KEYS_MUST_HAVE_SAME_SIZE.to_string(),
                ))
            }
            Some(w) => {
                for weight in w {
                    check_score(Some(*weight))?;
                }
                w.to_vec()
            }
            None => vec![1.0; keys.len()],
        };

        let sets = try_join_all(keys.iter().map(|key| read::<K, V, S, SortedSetBucket<V>>(&self.store, key))).await?;
        let sets: Vec<SortedSetBucket<V>> = sets.into_iter().map(Option::unwrap_or_default).collect();
        let inputs: Vec<(&SortedSetBucket<V>, f64)> = sets.iter().zip(weights).collect();
        Ok(SortedSetBucket::aggregate(kind, &inputs, function))
    }
}

impl<K, V, S: Clone> Clone for SortedSetCache<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}
