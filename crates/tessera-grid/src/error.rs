//! Error types for the grid.

use crate::grid::NodeId;
use thiserror::Error;

/// Errors raised by the grid while executing reads, updates and transactions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Unable to acquire lock on key {key} after {timeout_ms} ms")]
    LockTimeout { key: String, timeout_ms: u64 },

    #[error("Write conflict on key {0}")]
    WriteConflict(String),

    #[error("Transaction {0} is not active")]
    TransactionNotActive(u64),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} is the last member and can't leave")]
    LastMember(NodeId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
