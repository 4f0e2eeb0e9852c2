//! Scored values and score aggregation.

use crate::error::{BucketError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A `(score, value)` pair held by a sorted set.
///
/// Ordered by score first (IEEE total order, `-0.0` folded into `0.0`), then by value,
/// so every member sees the same ordering whatever order the writes arrived in.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScoredValue<V> {
    score: f64,
    value: V,
}

impl<V> ScoredValue<V> {
    pub fn new(score: f64, value: V) -> Self {
        Self {
            score: normalize(score),
            value,
        }
    }

    /// Like [`ScoredValue::new`] but rejects NaN.
    pub fn checked(score: f64, value: V) -> Result<Self> {
        if score.is_nan() {
            return Err(BucketError::NotANumber);
        }
        Ok(Self::new(score, value))
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn into_parts(self) -> (f64, V) {
        (self.score, self.value)
    }
}

pub(crate) fn normalize(score: f64) -> f64 {
    if score == 0.0 {
        0.0
    } else {
        score
    }
}

impl<V: PartialEq> PartialEq for ScoredValue<V> {
    fn eq(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score) == Ordering::Equal && self.value == other.value
    }
}

impl<V: Eq> Eq for ScoredValue<V> {}

impl<V: Ord> PartialOrd for ScoredValue<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: Ord> Ord for ScoredValue<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl<V> From<(f64, V)> for ScoredValue<V> {
    fn from((score, value): (f64, V)) -> Self {
        Self::new(score, value)
    }
}

/// How scores from several sorted sets are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    #[default]
    Sum,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn apply(self, acc: f64, score: f64) -> f64 {
        let combined = match self {
            AggregateFunction::Sum => acc + score,
            AggregateFunction::Min => acc.min(score),
            AggregateFunction::Max => acc.max(score),
        };
        defined(combined)
    }
}

/// Whether values must appear in any (`Union`) or all (`Inter`) inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateKind {
    Union,
    Inter,
}

/// `inf - inf` and `0 * inf` count as 0.
pub(crate) fn defined(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        normalize(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_by_score_then_value() {
        let a = ScoredValue::new(1.0, "oihana");
        let b = ScoredValue::new(1.0, "elaia");
        let c = ScoredValue::new(0.5, "ramon");
        let mut all = vec![a.clone(), b.clone(), c.clone()];
        all.sort();
        assert_eq!(all, vec![c, b, a]);
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let a = ScoredValue::new(-0.0, 1);
        let b = ScoredValue::new(0.0, 1);
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_checked_rejects_nan() {
        assert_eq!(ScoredValue::checked(f64::NAN, 1), Err(BucketError::NotANumber));
        assert!(ScoredValue::checked(f64::INFINITY, 1).is_ok());
    }

    #[test]
    fn test_aggregate_functions() {
        assert_eq!(AggregateFunction::Sum.apply(2.0, 3.0), 5.0);
        assert_eq!(AggregateFunction::Min.apply(2.0, 3.0), 2.0);
        assert_eq!(AggregateFunction::Max.apply(2.0, 3.0), 3.0);
        assert_eq!(
            AggregateFunction::Sum.apply(f64::INFINITY, f64::NEG_INFINITY),
            0.0
        );
    }

    #[test]
    fn test_serde_shape() {
        let sv = ScoredValue::new(2.5, "julien".to_string());
        let json = serde_json::to_string(&sv).unwrap();
        assert_eq!(json, r#"{"score":2.5,"value":"julien"}"#);
        let back: ScoredValue<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sv);
    }
}
