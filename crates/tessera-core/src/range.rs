//! Index and bound helpers shared by rank-addressed buckets.

use std::ops::Bound;

/// Resolves a possibly negative index against `len`. `-1` is the last element.
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        Some(resolved as usize)
    } else {
        None
    }
}

/// Normalizes an inclusive `[start, stop]` rank range against `len`.
///
/// Negative positions count from the tail, `start` is clamped to 0 and `stop`
/// to the last position. Returns `None` when the range selects nothing.
pub fn clamp_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }
    let n = len as i64;
    let mut start = if start < 0 { start + n } else { start };
    let mut stop = if stop < 0 { stop + n } else { stop };
    start = start.max(0);
    if start > stop || start >= n {
        return None;
    }
    stop = stop.min(n - 1);
    Some((start as usize, stop as usize))
}

/// Builds a [`Bound`] from an optional endpoint; `None` is unbounded.
pub fn bound<T>(value: Option<T>, inclusive: bool) -> Bound<T> {
    match value {
        None => Bound::Unbounded,
        Some(v) if inclusive => Bound::Included(v),
        Some(v) => Bound::Excluded(v),
    }
}

pub(crate) fn above_lower<T, F>(lower: &Bound<T>, cmp: F) -> bool
where
    F: Fn(&T) -> std::cmp::Ordering,
{
    use std::cmp::Ordering::*;
    match lower {
        Bound::Unbounded => true,
        Bound::Included(min) => cmp(min) != Less,
        Bound::Excluded(min) => cmp(min) == Greater,
    }
}

pub(crate) fn below_upper<T, F>(upper: &Bound<T>, cmp: F) -> bool
where
    F: Fn(&T) -> std::cmp::Ordering,
{
    use std::cmp::Ordering::*;
    match upper {
        Bound::Unbounded => true,
        Bound::Included(max) => cmp(max) != Greater,
        Bound::Excluded(max) => cmp(max) == Less,
    }
}
