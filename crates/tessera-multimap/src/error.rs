//! Error types for the facades.

use tessera_core::{BucketError, BucketKind, Nullable};
use tessera_grid::GridError;
use thiserror::Error;

/// Errors returned by facade operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MultimapError {
    /// A required argument was null; carries the fixed message.
    #[error("{0}")]
    NullArgument(&'static str),

    #[error("{0}")]
    IllegalArgument(String),

    #[error("Wrong bucket kind: expected {expected}, found {found}")]
    WrongBucketKind {
        expected: BucketKind,
        found: BucketKind,
    },

    #[error(transparent)]
    Bucket(#[from] BucketError),

    #[error(transparent)]
    Grid(#[from] GridError),
}

pub type Result<T> = std::result::Result<T, MultimapError>;

/// Fails with `message` if `value` is null.
pub(crate) fn require_non_null<T: Nullable + ?Sized>(value: &T, message: &'static str) -> Result<()> {
    if value.is_null() {
        Err(MultimapError::NullArgument(message))
    } else {
        Ok(())
    }
}

/// Fails with `message` if any of `values` is null.
pub(crate) fn require_all_non_null<T: Nullable>(values: &[T], message: &'static str) -> Result<()> {
    if values.iter().any(Nullable::is_null) {
        Err(MultimapError::NullArgument(message))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::error::ERR_KEY_CAN_T_BE_NULL;

    #[test]
    fn test_null_argument_message_is_exact() {
        let err = require_non_null(&None::<String>, ERR_KEY_CAN_T_BE_NULL).unwrap_err();
        assert_eq!(err.to_string(), "key can't be null");
        assert!(require_non_null(&"k".to_string(), ERR_KEY_CAN_T_BE_NULL).is_ok());
    }

    #[test]
    fn test_conversions() {
        let err: MultimapError = BucketError::NotANumber.into();
        assert_eq!(err.to_string(), "Score is not a number");
        let err: MultimapError = GridError::WriteConflict("k".into()).into();
        assert!(matches!(err, MultimapError::Grid(GridError::WriteConflict(_))));
    }
}
