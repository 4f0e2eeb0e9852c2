//! Tessera multimap - typed collection facades over the grid.
//!
//! Each facade stores one bucket kind per key and turns every mutation into a
//! pure update function submitted through [`tessera_grid::AtomicMap`]. Arguments
//! are validated before anything reaches the grid.
//!
//! - [`SortedSetCache`] - scored values with rank, score and value ranges
//! - [`ListCache`] - a list addressable from both ends
//! - [`SetCache`] - unique values
//! - [`PairCache`] - field maps
//! - [`MultimapCache`] - multi-valued keys with a duplicate policy
//!
//! Facades are generic over the store, so the same code runs against a
//! [`GridNode`](tessera_grid::GridNode) or inside a
//! [`Transaction`](tessera_grid::Transaction).
//!
//! # Quick Start
//!
//! ```rust
//! use tessera_core::{Bucket, SortedSetAddArgs};
//! use tessera_grid::{Grid, GridConfig};
//! use tessera_multimap::SortedSetCache;
//!
//! # tokio_test::block_on(async {
//! let grid: Grid<String, Bucket<String>> = Grid::new(GridConfig::builder().nodes(3).build());
//! let scores = SortedSetCache::new(grid.nodes()[0].clone());
//! let key = "leaderboard".to_string();
//!
//! let added = scores
//!     .add_many(&key, &[10.0, 30.0], &["ane".into(), "unai".into()], SortedSetAddArgs::default())
//!     .await
//!     .unwrap();
//! assert_eq!(added, 2);
//!
//! let best = scores.pop(&key, false, 1).await.unwrap();
//! assert_eq!(best[0].value(), "unai");
//! # });
//! ```

mod access;
pub mod error;
pub mod list;
pub mod multimap;
pub mod pair;
pub mod set;
pub mod sorted_set;

pub use error::{MultimapError, Result};
pub use list::ListCache;
pub use multimap::{ByContent, ByContentAndKind, DuplicatePolicy, Kinded, MultimapCache, ValueEquivalence};
pub use pair::PairCache;
pub use set::SetCache;
pub use sorted_set::SortedSetCache;
