//! Sequence bucket: an ordered list that tolerates duplicates.

use crate::args::IndexOfArgs;
use crate::error::{BucketError, Result};
use crate::range::{clamp_range, resolve_index};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceBucket<V> {
    values: VecDeque<V>,
}

/// Result of inserting around a pivot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOutcome {
    /// Nothing stored under the key.
    NoSuchKey,
    /// The pivot value does not occur in the list.
    PivotNotFound,
    /// Inserted; carries the new length.
    Inserted(usize),
}

impl InsertOutcome {
    /// `0`, `-1` or the new length, as list protocols report it.
    pub fn as_redis_int(&self) -> i64 {
        match self {
            InsertOutcome::NoSuchKey => 0,
            InsertOutcome::PivotNotFound => -1,
            InsertOutcome::Inserted(len) => *len as i64,
        }
    }
}

impl<V: Clone + PartialEq> SequenceBucket<V> {
    pub fn new() -> Self {
        Self {
            values: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.values.iter()
    }

    pub fn to_vec(&self) -> Vec<V> {
        self.values.iter().cloned().collect()
    }

    pub fn offer_first(&mut self, value: V) {
        self.values.push_front(value);
    }

    pub fn offer_last(&mut self, value: V) {
        self.values.push_back(value);
    }

    /// Pops up to `count` values from the head, in pop order.
    pub fn poll_first(&mut self, count: usize) -> Vec<V> {
        let n = count.min(self.len());
        self.values.drain(..n).collect()
    }

    /// Pops up to `count` values from the tail, in pop order.
    pub fn poll_last(&mut self, count: usize) -> Vec<V> {
        let n = count.min(self.len());
        let start = self.len() - n;
        self.values.drain(start..).rev().collect()
    }

    pub fn index(&self, index: i64) -> Option<&V> {
        resolve_index(index, self.len()).and_then(|i| self.values.get(i))
    }

    pub fn set(&mut self, index: i64, value: V) -> Result<()> {
        let length = self.len();
        let slot = resolve_index(index, length)
            .and_then(|i| self.values.get_mut(i))
            .ok_or(BucketError::IndexOutOfRange { index, length })?;
        *slot = value;
        Ok(())
    }

    /// Inclusive range; out-of-range bounds are clamped.
    pub fn sub_list(&self, start: i64, stop: i64) -> Vec<V> {
        match clamp_range(start, stop, self.len()) {
            Some((from, to)) => self.values.range(from..=to).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Positions of `value`, ascending.
    ///
    /// Matching starts at the `rank`-th occurrence (negative ranks count from the
    /// tail), stops after `count` matches (0 = all) or `max_len` scanned elements
    /// (0 = unbounded).
    pub fn index_of(&self, value: &V, args: &IndexOfArgs) -> Vec<usize> {
        let scan_limit = if args.max_len == 0 {
            self.len()
        } else {
            args.max_len.min(self.len())
        };
        let mut skip = args.rank.unsigned_abs().saturating_sub(1);
        let mut found = Vec::new();

        let positions: Box<dyn Iterator<Item = usize>> = if args.rank > 0 {
            Box::new(0..self.len())
        } else {
            Box::new((0..self.len()).rev())
        };
        for pos in positions.take(scan_limit) {
            if &self.values[pos] != value {
                continue;
            }
            if skip > 0 {
                skip -= 1;
                continue;
            }
            found.push(pos);
            if args.count > 0 && found.len() == args.count {
                break;
            }
        }
        found.sort_unstable();
        found
    }

    /// Inserts `values` next to the first occurrence of `pivot`.
    pub fn insert(&mut self, before: bool, pivot: &V, values: Vec<V>) -> InsertOutcome {
        let Some(pos) = self.values.iter().position(|v| v == pivot) else {
            return InsertOutcome::PivotNotFound;
        };
        let at = if before { pos } else { pos + 1 };
        for (offset, value) in values.into_iter().enumerate() {
            self.values.insert(at + offset, value);
        }
        InsertOutcome::Inserted(self.len())
    }

    /// Removes occurrences of `value`: all of them for `count == 0`, the first
    /// `count` from the head when positive, from the tail when negative.
    pub fn remove(&mut self, count: i64, value: &V) -> usize {
        let limit = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs() as usize
        };
        let mut removed = 0;
        if count >= 0 {
            let mut i = 0;
            while i < self.values.len() && removed < limit {
                if &self.values[i] == value {
                    self.values.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = self.values.len();
            while i > 0 && removed < limit {
                i -= 1;
                if &self.values[i] == value {
                    self.values.remove(i);
                    removed += 1;
                }
            }
        }
        removed
    }

    /// Keeps only the inclusive range `[start, stop]`.
    pub fn trim(&mut self, start: i64, stop: i64) {
        match clamp_range(start, stop, self.len()) {
            Some((from, to)) => {
                self.values.truncate(to + 1);
                self.values.drain(..from);
            }
            None => self.values.clear(),
        }
    }

    /// Moves one element between the ends and returns it.
    ///
    /// `pull_from_tail` moves the last element to the head, otherwise the head
    /// goes to the tail.
    pub fn rotate(&mut self, pull_from_tail: bool) -> Option<V> {
        if self.is_empty() {
            return None;
        }
        if pull_from_tail {
            self.values.rotate_right(1);
            self.values.front().cloned()
        } else {
            self.values.rotate_left(1);
            self.values.back().cloned()
        }
    }

    pub fn replace(&mut self, values: Vec<V>) -> usize {
        self.values = values.into();
        self.len()
    }

    pub fn contains(&self, value: &V) -> bool {
        self.values.contains(value)
    }
}

impl<V: Clone + PartialEq> Default for SequenceBucket<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + PartialEq> From<Vec<V>> for SequenceBucket<V> {
    fn from(values: Vec<V>) -> Self {
        Self {
            values: values.into(),
        }
    }
}

impl<V: Clone + PartialEq> FromIterator<V> for SequenceBucket<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(values: &[&'static str]) -> SequenceBucket<&'static str> {
        values.iter().copied().collect()
    }

    fn repeated() -> SequenceBucket<&'static str> {
        seq(&["o", "e", "k", "r", "r", "j", "e", "o", "o", "o"])
    }

    fn args(count: i64, rank: i64, max_len: i64) -> IndexOfArgs {
        IndexOfArgs::builder()
            .count(count)
            .rank(rank)
            .max_len(max_len)
            .build()
            .unwrap()
    }

    #[test]
    fn test_offer_both_ends() {
        let mut list = SequenceBucket::new();
        list.offer_last("o");
        list.offer_first("o");
        list.offer_last("e");
        list.offer_first("e");
        list.offer_last("o");
        assert_eq!(list.to_vec(), vec!["e", "o", "o", "e", "o"]);
    }

    #[test]
    fn test_poll_in_pop_order() {
        let mut list = seq(&["a", "b", "c", "d", "e"]);
        assert_eq!(list.poll_first(2), vec!["a", "b"]);
        assert_eq!(list.poll_last(2), vec!["e", "d"]);
        assert_eq!(list.poll_last(0), Vec::<&str>::new());
        assert_eq!(list.poll_first(10), vec!["c"]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_index_and_set() {
        let mut list = seq(&["a", "b", "c"]);
        assert_eq!(list.index(0), Some(&"a"));
        assert_eq!(list.index(-1), Some(&"c"));
        assert_eq!(list.index(3), None);
        assert_eq!(list.index(-4), None);

        list.set(-1, "z").unwrap();
        assert_eq!(list.to_vec(), vec!["a", "b", "z"]);
        assert_eq!(
            list.set(3, "x"),
            Err(BucketError::IndexOutOfRange { index: 3, length: 3 })
        );
        assert!(list.set(-4, "x").is_err());
    }

    #[test]
    fn test_sub_list() {
        let list = seq(&["a", "b", "c", "d", "e"]);
        assert_eq!(list.sub_list(0, -1), list.to_vec());
        assert_eq!(list.sub_list(0, 5), list.to_vec());
        assert_eq!(list.sub_list(1, 2), vec!["b", "c"]);
        assert_eq!(list.sub_list(-1, 7), vec!["e"]);
        assert_eq!(list.sub_list(-5, 1), vec!["a", "b"]);
        assert!(list.sub_list(3, 1).is_empty());
        assert!(list.sub_list(7, 9).is_empty());
    }

    #[test]
    fn test_index_of() {
        let list = repeated();
        assert_eq!(list.index_of(&"o", &IndexOfArgs::default()), vec![0]);
        assert_eq!(list.index_of(&"o", &args(0, 1, 0)), vec![0, 7, 8, 9]);
        assert_eq!(list.index_of(&"o", &args(1, 2, 0)), vec![7]);
        assert_eq!(list.index_of(&"o", &args(1, -1, 0)), vec![9]);
        assert_eq!(list.index_of(&"o", &args(2, 2, 0)), vec![7, 8]);
        assert_eq!(list.index_of(&"o", &args(0, 1, 3)), vec![0]);
        assert_eq!(list.index_of(&"o", &args(0, -1, 3)), vec![7, 8, 9]);
        assert_eq!(list.index_of(&"o", &args(2, -2, 3)), vec![7, 8]);
        assert!(list.index_of(&"o", &args(1, -2, 1)).is_empty());
        assert!(list.index_of(&"x", &args(0, 1, 0)).is_empty());
    }

    #[test]
    fn test_insert_around_pivot() {
        let mut list = seq(&["o", "e"]);
        assert_eq!(list.insert(false, &"o", vec!["r"]), InsertOutcome::Inserted(3));
        assert_eq!(list.to_vec(), vec!["o", "r", "e"]);
        assert_eq!(list.insert(true, &"e", vec!["j", "k"]), InsertOutcome::Inserted(5));
        assert_eq!(list.to_vec(), vec!["o", "r", "j", "k", "e"]);
        assert_eq!(list.insert(true, &"x", vec!["y"]), InsertOutcome::PivotNotFound);
        assert_eq!(InsertOutcome::PivotNotFound.as_redis_int(), -1);
        assert_eq!(InsertOutcome::NoSuchKey.as_redis_int(), 0);
        assert_eq!(InsertOutcome::Inserted(5).as_redis_int(), 5);
    }

    #[test]
    fn test_remove_by_count() {
        let mut list = repeated();
        assert_eq!(list.remove(1, &"o"), 1);
        assert_eq!(list.to_vec(), vec!["e", "k", "r", "r", "j", "e", "o", "o", "o"]);
        assert_eq!(list.remove(-2, &"o"), 2);
        assert_eq!(list.to_vec(), vec!["e", "k", "r", "r", "j", "e", "o"]);
        assert_eq!(list.remove(0, &"r"), 2);
        assert_eq!(list.remove(0, &"x"), 0);
        assert_eq!(list.to_vec(), vec!["e", "k", "j", "e", "o"]);
    }

    #[test]
    fn test_trim() {
        let mut list = seq(&["a", "b", "c", "d", "e"]);
        list.trim(1, -2);
        assert_eq!(list.to_vec(), vec!["b", "c", "d"]);
        list.trim(0, 100);
        assert_eq!(list.len(), 3);
        list.trim(-1, -3);
        assert!(list.is_empty());
    }

    #[test]
    fn test_rotate() {
        let mut list = seq(&["a", "b", "c"]);
        assert_eq!(list.rotate(false), Some("a"));
        assert_eq!(list.to_vec(), vec!["b", "c", "a"]);
        assert_eq!(list.rotate(true), Some("a"));
        assert_eq!(list.to_vec(), vec!["a", "b", "c"]);
        assert_eq!(SequenceBucket::<&str>::new().rotate(true), None);
    }

    #[test]
    fn test_replace() {
        let mut list = seq(&["a"]);
        assert_eq!(list.replace(vec!["x", "y"]), 2);
        assert_eq!(list.to_vec(), vec!["x", "y"]);
        assert_eq!(list.replace(Vec::new()), 0);
        assert!(list.is_empty());
    }
}
