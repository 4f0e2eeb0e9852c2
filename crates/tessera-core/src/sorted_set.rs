//! Sorted set bucket: unique values ordered by score, then by value.
//!
//! Two indexes are kept in step: `scores` answers "what is the score of v" and
//! `entries` holds the canonical iteration order. Every mutation goes through
//! `insert_entry`/`remove_entry` so they never diverge.

use crate::args::{SortedSetAddArgs, SortedSetSubsetArgs};
use crate::error::{BucketError, Result};
use crate::range::{above_lower, below_upper, bound, clamp_range};
use crate::scored::{defined, normalize, AggregateFunction, AggregateKind, ScoredValue};
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(
    from = "Vec<ScoredValue<V>>",
    into = "Vec<ScoredValue<V>>",
    bound(
        serialize = "V: Ord + Clone + Serialize",
        deserialize = "V: Ord + Clone + Deserialize<'de>"
    )
)]
pub struct SortedSetBucket<V: Ord + Clone> {
    scores: BTreeMap<V, f64>,
    entries: BTreeSet<ScoredValue<V>>,
}

impl<V: Ord + Clone> SortedSetBucket<V> {
    pub fn new() -> Self {
        Self {
            scores: BTreeMap::new(),
            entries: BTreeSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ScoredValue<V>> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<ScoredValue<V>> {
        self.entries.iter().cloned().collect()
    }

    pub fn contains(&self, value: &V) -> bool {
        self.scores.contains_key(value)
    }

    pub fn score(&self, value: &V) -> Option<f64> {
        self.scores.get(value).copied()
    }

    pub fn scores(&self, values: &[V]) -> Vec<Option<f64>> {
        values.iter().map(|v| self.score(v)).collect()
    }

    fn insert_entry(&mut self, score: f64, value: V) {
        let score = normalize(score);
        if let Some(old) = self.scores.insert(value.clone(), score) {
            self.entries.remove(&ScoredValue::new(old, value.clone()));
        }
        self.entries.insert(ScoredValue::new(score, value));
    }

    fn remove_entry(&mut self, value: &V) -> bool {
        match self.scores.remove(value) {
            Some(old) => {
                self.entries.remove(&ScoredValue::new(old, value.clone()));
                true
            }
            None => false,
        }
    }

    // === Adding ===

    /// Adds or updates `items` in order and returns the number of created values,
    /// or created plus updated values with `return_changed_count`.
    pub fn add_many<I>(&mut self, items: I, args: &SortedSetAddArgs) -> Result<usize>
    where
        I: IntoIterator<Item = ScoredValue<V>>,
    {
        let items: Vec<ScoredValue<V>> = items.into_iter().collect();
        if items.iter().any(|sv| sv.score().is_nan()) {
            return Err(BucketError::NotANumber);
        }

        let mut created = 0;
        let mut updated = 0;
        for item in items {
            let (score, value) = item.into_parts();
            match self.score(&value) {
                None => {
                    if args.update_only {
                        continue;
                    }
                    self.insert_entry(score, value);
                    created += 1;
                }
                Some(old) => {
                    if args.add_only || !score_allowed(args, old, score) {
                        continue;
                    }
                    if old.total_cmp(&score) == Ordering::Equal {
                        continue;
                    }
                    self.insert_entry(score, value);
                    updated += 1;
                }
            }
        }

        Ok(if args.return_changed_count {
            created + updated
        } else {
            created
        })
    }

    /// Adds `delta` to the score of `value` (absent values start from 0).
    ///
    /// Returns `None` when `args` prevents the write.
    pub fn increment_score(
        &mut self,
        value: V,
        delta: f64,
        args: &SortedSetAddArgs,
    ) -> Result<Option<f64>> {
        let old = self.score(&value);
        let new = match old {
            Some(o) => o + delta,
            None => delta,
        };
        if new.is_nan() {
            return Err(BucketError::NotANumber);
        }
        match old {
            None if args.update_only => return Ok(None),
            Some(_) if args.add_only => return Ok(None),
            Some(o) if !score_allowed(args, o, new) => return Ok(None),
            _ => {}
        }
        self.insert_entry(new, value);
        Ok(Some(normalize(new)))
    }

    // === Range queries ===

    pub fn count_by_score(&self, min: Bound<f64>, max: Bound<f64>) -> usize {
        self.entries
            .iter()
            .filter(|sv| score_within(sv.score(), &min, &max))
            .count()
    }

    pub fn count_by_lex(&self, min: Bound<&V>, max: Bound<&V>) -> usize {
        self.entries
            .iter()
            .filter(|sv| value_within(sv.value(), &min, &max))
            .count()
    }

    /// Elements between two ranks (inclusive, negative ranks from the end).
    /// With `is_rev`, rank 0 is the highest element.
    pub fn subset_by_index(&self, start: i64, stop: i64, is_rev: bool) -> Vec<ScoredValue<V>> {
        let Some((from, to)) = clamp_range(start, stop, self.len()) else {
            return Vec::new();
        };
        let take = to - from + 1;
        if is_rev {
            self.entries.iter().rev().skip(from).take(take).cloned().collect()
        } else {
            self.entries.iter().skip(from).take(take).cloned().collect()
        }
    }

    pub fn subset_by_score(&self, args: &SortedSetSubsetArgs<f64>) -> Vec<ScoredValue<V>> {
        let (min, max) = oriented_bounds(args, |s| *s);
        self.collect_ordered(args.is_rev, |sv| score_within(sv.score(), &min, &max))
    }

    /// Lexicographic range. Only meaningful when all candidates share a score.
    pub fn subset_by_lex(&self, args: &SortedSetSubsetArgs<V>) -> Vec<ScoredValue<V>> {
        let (min, max) = oriented_bounds(args, |v| v);
        self.collect_ordered(args.is_rev, |sv| value_within(sv.value(), &min, &max))
    }

    fn collect_ordered<F>(&self, rev: bool, keep: F) -> Vec<ScoredValue<V>>
    where
        F: Fn(&ScoredValue<V>) -> bool,
    {
        if rev {
            self.entries.iter().rev().filter(|sv| keep(sv)).cloned().collect()
        } else {
            self.entries.iter().filter(|sv| keep(sv)).cloned().collect()
        }
    }

    /// Rank and score of `member`; rank 0 is the lowest, or the highest with `is_rev`.
    pub fn index_of(&self, member: &V, is_rev: bool) -> Option<(usize, f64)> {
        let score = self.score(member)?;
        let rank = self
            .entries
            .iter()
            .position(|sv| sv.value() == member)?;
        let rank = if is_rev { self.len() - 1 - rank } else { rank };
        Some((rank, score))
    }

    // === Removal ===

    pub fn remove_values(&mut self, values: &[V]) -> usize {
        values.iter().filter(|v| self.remove_entry(v)).count()
    }

    pub fn remove_by_rank(&mut self, start: i64, stop: i64) -> usize {
        let doomed = self.subset_by_index(start, stop, false);
        self.remove_scored(doomed)
    }

    pub fn remove_by_score(&mut self, min: Bound<f64>, max: Bound<f64>) -> usize {
        let doomed: Vec<_> = self
            .entries
            .iter()
            .filter(|sv| score_within(sv.score(), &min, &max))
            .cloned()
            .collect();
        self.remove_scored(doomed)
    }

    pub fn remove_by_lex(&mut self, min: Bound<&V>, max: Bound<&V>) -> usize {
        let doomed: Vec<_> = self
            .entries
            .iter()
            .filter(|sv| value_within(sv.value(), &min, &max))
            .cloned()
            .collect();
        self.remove_scored(doomed)
    }

    fn remove_scored(&mut self, doomed: Vec<ScoredValue<V>>) -> usize {
        let removed = doomed.len();
        for sv in doomed {
            self.scores.remove(sv.value());
            self.entries.remove(&sv);
        }
        removed
    }

    /// Removes up to `count` elements from the low end (or the high end) and
    /// returns them in extraction order.
    pub fn pop(&mut self, from_min: bool, count: usize) -> Vec<ScoredValue<V>> {
        let mut popped = Vec::with_capacity(count.min(self.len()));
        while popped.len() < count {
            let next = if from_min {
                self.entries.pop_first()
            } else {
                self.entries.pop_last()
            };
            match next {
                Some(sv) => {
                    self.scores.remove(sv.value());
                    popped.push(sv);
                }
                None => break,
            }
        }
        popped
    }

    /// A positive `count` picks up to `count` distinct elements; a negative one
    /// picks `|count|` elements that may repeat.
    pub fn random_members<R: Rng + ?Sized>(&self, count: i64, rng: &mut R) -> Vec<ScoredValue<V>> {
        if self.is_empty() || count == 0 {
            return Vec::new();
        }
        if count > 0 {
            let mut picked = self
                .entries
                .iter()
                .cloned()
                .choose_multiple(rng, count as usize);
            picked.shuffle(rng);
            picked
        } else {
            let all: Vec<&ScoredValue<V>> = self.entries.iter().collect();
            (0..count.unsigned_abs())
                .filter_map(|_| all.choose(rng).map(|sv| (*sv).clone()))
                .collect()
        }
    }

    // === Aggregation ===

    /// Weighted union or intersection of several sets, returned in canonical order.
    pub fn aggregate(
        kind: AggregateKind,
        inputs: &[(&SortedSetBucket<V>, f64)],
        function: AggregateFunction,
    ) -> Vec<ScoredValue<V>> {
        let mut combined: BTreeMap<V, f64> = BTreeMap::new();
        match kind {
            AggregateKind::Union => {
                for (set, weight) in inputs {
                    for sv in set.iter() {
                        let weighted = defined(sv.score() * weight);
                        combined
                            .entry(sv.value().clone())
                            .and_modify(|acc| *acc = function.apply(*acc, weighted))
                            .or_insert(weighted);
                    }
                }
            }
            AggregateKind::Inter => {
                let Some(((first, first_weight), rest)) = inputs.split_first() else {
                    return Vec::new();
                };
                'candidates: for sv in first.iter() {
                    let mut acc = defined(sv.score() * first_weight);
                    for (set, weight) in rest {
                        match set.score(sv.value()) {
                            Some(s) => acc = function.apply(acc, defined(s * weight)),
                            None => continue 'candidates,
                        }
                    }
                    combined.insert(sv.value().clone(), acc);
                }
            }
        }
        let ordered: BTreeSet<ScoredValue<V>> = combined
            .into_iter()
            .map(|(v, s)| ScoredValue::new(s, v))
            .collect();
        ordered.into_iter().collect()
    }
}

fn score_allowed(args: &SortedSetAddArgs, old: f64, new: f64) -> bool {
    if args.update_greater_scores_only && new.total_cmp(&old) != Ordering::Greater {
        return false;
    }
    if args.update_less_scores_only && new.total_cmp(&old) != Ordering::Less {
        return false;
    }
    true
}

fn score_within(score: f64, min: &Bound<f64>, max: &Bound<f64>) -> bool {
    above_lower(min, |m| score.total_cmp(m)) && below_upper(max, |m| score.total_cmp(m))
}

fn value_within<V: Ord>(value: &V, min: &Bound<&V>, max: &Bound<&V>) -> bool {
    above_lower(min, |m| value.cmp(m)) && below_upper(max, |m| value.cmp(m))
}

/// Turns `start`/`stop` into `(lower, upper)`, swapping them when reversed.
fn oriented_bounds<'a, T, B, F>(args: &'a SortedSetSubsetArgs<T>, view: F) -> (Bound<B>, Bound<B>)
where
    F: Fn(&'a T) -> B,
{
    let start = bound(args.start.as_ref().map(&view), args.include_start);
    let stop = bound(args.stop.as_ref().map(&view), args.include_stop);
    if args.is_rev {
        (stop, start)
    } else {
        (start, stop)
    }
}

impl<V: Ord + Clone> Default for SortedSetBucket<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Ord + Clone> PartialEq for SortedSetBucket<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<V: Ord + Clone> Eq for SortedSetBucket<V> {}

impl<V: Ord + Clone> From<Vec<ScoredValue<V>>> for SortedSetBucket<V> {
    fn from(items: Vec<ScoredValue<V>>) -> Self {
        let mut bucket = Self::new();
        for item in items {
            let (score, value) = item.into_parts();
            bucket.insert_entry(defined(score), value);
        }
        bucket
    }
}

impl<V: Ord + Clone> From<SortedSetBucket<V>> for Vec<ScoredValue<V>> {
    fn from(bucket: SortedSetBucket<V>) -> Self {
        bucket.entries.into_iter().collect()
    }
}

impl<V: Ord + Clone> FromIterator<ScoredValue<V>> for SortedSetBucket<V> {
    fn from_iter<I: IntoIterator<Item = ScoredValue<V>>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}
