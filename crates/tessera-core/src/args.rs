//! Validated option objects for conditional bucket operations.
//!
//! Conflicting options are rejected by `build()`, never at execution time.

use crate::error::{
    BucketError, Result, ADD_AND_UPDATE_ONLY_INCOMPATIBLE_ERROR,
    ADD_AND_UPDATE_OPTIONS_INCOMPATIBLE_ERROR, ERR_COUNT_CAN_T_BE_NEGATIVE,
    ERR_MAXLEN_CAN_T_BE_NEGATIVE, ERR_RANK_CAN_T_BE_ZERO,
};
use serde::{Deserialize, Serialize};

/// Flags for adding to a sorted set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedSetAddArgs {
    /// Skip values that already exist.
    pub add_only: bool,
    /// Skip values that don't exist yet.
    pub update_only: bool,
    /// Only update an existing score if the new one is greater.
    pub update_greater_scores_only: bool,
    /// Only update an existing score if the new one is less.
    pub update_less_scores_only: bool,
    /// Count updated elements as well as created ones.
    pub return_changed_count: bool,
}

impl SortedSetAddArgs {
    pub fn builder() -> SortedSetAddArgsBuilder {
        SortedSetAddArgsBuilder::new()
    }
}

/// Builder for [`SortedSetAddArgs`].
#[derive(Clone, Debug, Default)]
pub struct SortedSetAddArgsBuilder {
    args: SortedSetAddArgs,
}

impl SortedSetAddArgsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_only(mut self) -> Self {
        self.args.add_only = true;
        self
    }

    pub fn update_only(mut self) -> Self {
        self.args.update_only = true;
        self
    }

    pub fn update_greater_scores_only(mut self) -> Self {
        self.args.update_greater_scores_only = true;
        self
    }

    pub fn update_less_scores_only(mut self) -> Self {
        self.args.update_less_scores_only = true;
        self
    }

    pub fn return_changed_count(mut self) -> Self {
        self.args.return_changed_count = true;
        self
    }

    pub fn build(self) -> Result<SortedSetAddArgs> {
        let args = self.args;
        if args.add_only && args.update_only {
            return Err(BucketError::IllegalState(
                ADD_AND_UPDATE_ONLY_INCOMPATIBLE_ERROR,
            ));
        }
        let exclusive = [
            args.add_only,
            args.update_greater_scores_only,
            args.update_less_scores_only,
        ];
        if exclusive.iter().filter(|set| **set).count() > 1 {
            return Err(BucketError::IllegalState(
                ADD_AND_UPDATE_OPTIONS_INCOMPATIBLE_ERROR,
            ));
        }
        Ok(args)
    }
}

/// Range arguments for `subset_by_*` queries.
///
/// `None` bounds are unbounded. With `is_rev`, `start` is the upper bound and
/// `stop` the lower one, and results come back in descending order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortedSetSubsetArgs<T> {
    pub start: Option<T>,
    pub stop: Option<T>,
    pub include_start: bool,
    pub include_stop: bool,
    pub is_rev: bool,
}

impl<T> Default for SortedSetSubsetArgs<T> {
    fn default() -> Self {
        Self {
            start: None,
            stop: None,
            include_start: false,
            include_stop: false,
            is_rev: false,
        }
    }
}

impl<T> SortedSetSubsetArgs<T> {
    pub fn builder() -> SortedSetSubsetArgsBuilder<T> {
        SortedSetSubsetArgsBuilder {
            args: Self::default(),
        }
    }
}

/// Builder for [`SortedSetSubsetArgs`].
#[derive(Clone, Debug)]
pub struct SortedSetSubsetArgsBuilder<T> {
    args: SortedSetSubsetArgs<T>,
}

impl<T> SortedSetSubsetArgsBuilder<T> {
    pub fn start(mut self, start: T) -> Self {
        self.args.start = Some(start);
        self
    }

    pub fn stop(mut self, stop: T) -> Self {
        self.args.stop = Some(stop);
        self
    }

    pub fn include_start(mut self, include: bool) -> Self {
        self.args.include_start = include;
        self
    }

    pub fn include_stop(mut self, include: bool) -> Self {
        self.args.include_stop = include;
        self
    }

    pub fn is_rev(mut self, rev: bool) -> Self {
        self.args.is_rev = rev;
        self
    }

    pub fn build(self) -> SortedSetSubsetArgs<T> {
        self.args
    }
}

/// Arguments for locating a value in a sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOfArgs {
    /// Maximum matches returned, 0 for all.
    pub count: usize,
    /// Which match to start from; negative scans from the tail.
    pub rank: i64,
    /// Maximum elements scanned, 0 for unbounded.
    pub max_len: usize,
}

impl Default for IndexOfArgs {
    fn default() -> Self {
        Self {
            count: 1,
            rank: 1,
            max_len: 0,
        }
    }
}

impl IndexOfArgs {
    pub fn builder() -> IndexOfArgsBuilder {
        IndexOfArgsBuilder::default()
    }
}

/// Builder for [`IndexOfArgs`]. Takes signed inputs as protocol adapters pass them.
#[derive(Clone, Debug, Default)]
pub struct IndexOfArgsBuilder {
    count: Option<i64>,
    rank: Option<i64>,
    max_len: Option<i64>,
}

impl IndexOfArgsBuilder {
    pub fn count(mut self, count: i64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = Some(rank);
        self
    }

    pub fn max_len(mut self, max_len: i64) -> Self {
        self.max_len = Some(max_len);
        self
    }

    pub fn build(self) -> Result<IndexOfArgs> {
        let defaults = IndexOfArgs::default();
        let count = match self.count {
            Some(c) if c < 0 => return Err(BucketError::IllegalArgument(ERR_COUNT_CAN_T_BE_NEGATIVE)),
            Some(c) => c as usize,
            None => defaults.count,
        };
        let rank = match self.rank {
            Some(0) => return Err(BucketError::IllegalArgument(ERR_RANK_CAN_T_BE_ZERO)),
            Some(r) => r,
            None => defaults.rank,
        };
        let max_len = match self.max_len {
            Some(m) if m < 0 => {
                return Err(BucketError::IllegalArgument(ERR_MAXLEN_CAN_T_BE_NEGATIVE))
            }
            Some(m) => m as usize,
            None => defaults.max_len,
        };
        Ok(IndexOfArgs {
            count,
            rank,
            max_len,
        })
    }
}
