//! Error types and fixed precondition messages for bucket operations.

use thiserror::Error;

pub const ERR_KEY_CAN_T_BE_NULL: &str = "key can't be null";
pub const ERR_VALUE_CAN_T_BE_NULL: &str = "value can't be null";
pub const ERR_VALUES_CAN_T_BE_NULL: &str = "values can't be null";
pub const ERR_SCORES_CAN_T_BE_NULL: &str = "scores can't be null";
pub const ERR_MEMBER_CAN_T_BE_NULL: &str = "member can't be null";
pub const ERR_MEMBERS_CAN_T_BE_NULL: &str = "members can't be null";
pub const ERR_ELEMENT_CAN_T_BE_NULL: &str = "element can't be null";
pub const ERR_PIVOT_CAN_T_BE_NULL: &str = "pivot can't be null";
pub const ERR_FIELD_CAN_T_BE_NULL: &str = "field can't be null";
pub const ERR_ARGS_CAN_T_BE_NULL: &str = "args can't be null";
pub const ERR_ARGS_INDEXES_CAN_T_BE_NULL: &str = "min and max indexes (from-to) can't be null";
pub const ERR_SCORES_VALUES_MUST_HAVE_SAME_SIZE: &str = "scores and values must have the same size";
pub const ERR_WEIGHTS_KEYS_MUST_HAVE_SAME_SIZE: &str = "weights and keys must have the same size";

pub const ADD_AND_UPDATE_ONLY_INCOMPATIBLE_ERROR: &str =
    "addOnly and updateOnly can't both be set";
pub const ADD_AND_UPDATE_OPTIONS_INCOMPATIBLE_ERROR: &str =
    "addOnly, updateGreaterScoresOnly and updateLessScoresOnly are mutually exclusive";
pub const ERR_COUNT_CAN_T_BE_NEGATIVE: &str = "count can't be negative";
pub const ERR_RANK_CAN_T_BE_ZERO: &str = "rank can't be zero";
pub const ERR_MAXLEN_CAN_T_BE_NEGATIVE: &str = "maxLen can't be negative";
pub const ERR_INDEX_OUT_OF_RANGE: &str = "Index is out of range";

/// Errors raised by pure bucket functions and option builders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BucketError {
    #[error("Index is out of range: {index} (length: {length})")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("Score is not a number")]
    NotANumber,

    #[error("{0}")]
    IllegalArgument(&'static str),

    #[error("{0}")]
    IllegalState(&'static str),
}

pub type Result<T> = std::result::Result<T, BucketError>;
