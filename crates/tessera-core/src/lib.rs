//! Tessera core - bucket value types for a composite-value data grid.
//!
//! Every bucket here is a plain value. Mutations happen on a private copy held by
//! an update function, so applying the same function to the same input twice
//! always produces the same output.
//!
//! - [`sorted_set`] - unique values ordered by score
//! - [`sequence`] - duplicate-tolerant list addressable from both ends
//! - [`set`] - unique values
//! - [`pair`] - field map
//! - [`bucket`] - the tagged union stored under a key
//! - [`args`] - validated option builders

pub mod args;
pub mod bucket;
pub mod element;
pub mod error;
pub mod pair;
pub mod range;
pub mod scored;
pub mod sequence;
pub mod set;
pub mod sorted_set;

pub use args::{IndexOfArgs, SortedSetAddArgs, SortedSetSubsetArgs};
pub use bucket::{Bucket, BucketKind, BucketVariant};
pub use element::{Element, Nullable};
pub use error::{BucketError, Result};
pub use pair::PairBucket;
pub use scored::{AggregateFunction, AggregateKind, ScoredValue};
pub use sequence::{InsertOutcome, SequenceBucket};
pub use set::SetBucket;
pub use sorted_set::SortedSetBucket;
