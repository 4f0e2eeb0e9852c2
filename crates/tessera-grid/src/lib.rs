//! Tessera grid - the clustered key-value engine composite values live in.
//!
//! The engine exposes one capability, [`AtomicMap`]: read a key, or apply a pure
//! function to it atomically. Everything else here exists to make that
//! capability behave like a small cluster:
//!
//! - [`grid`] - members, owner selection, backup replication and near-caches
//! - [`transaction`] - staged writes with read-committed or repeatable-read
//!   isolation and optimistic or pessimistic locking
//! - [`codec`] - how values are shipped between members
//! - [`config`] - grid configuration
//! - [`error`] - error types
//!
//! # Quick Start
//!
//! ```rust
//! use tessera_grid::{AtomicMap, Grid, GridConfig, Write};
//!
//! # tokio_test::block_on(async {
//! let grid: Grid<String, u64> = Grid::new(GridConfig::builder().nodes(2).build());
//! let node = grid.nodes()[1].clone();
//!
//! let next = node
//!     .atomic_update(&"hits".to_string(), |old: Option<&u64>| {
//!         let next = old.copied().unwrap_or(0) + 1;
//!         (Write::Put(next), next)
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(next, 1);
//! assert_eq!(grid.nodes()[0].get(&"hits".to_string()).await.unwrap(), Some(1));
//! # });
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod grid;
mod lock;
pub mod map;
mod store;
pub mod transaction;

pub use codec::{Codec, JsonCodec};
pub use config::{GridConfig, GridConfigBuilder};
pub use error::{GridError, Result};
pub use grid::{Grid, GridNode, NodeId};
pub use map::{AtomicMap, GridKey, GridValue, Write};
pub use transaction::{IsolationLevel, LockingMode, Transaction, TransactionOptions};
