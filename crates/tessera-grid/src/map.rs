//! The atomic key-value capability every composite value is built on.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::hash::Hash;

/// Keys the grid can route and lock.
pub trait GridKey: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

impl<T> GridKey for T where T: Hash + Eq + Clone + Debug + Send + Sync + 'static {}

/// Values the grid can store.
pub trait GridValue: Clone + Send + Sync + 'static {}

impl<T> GridValue for T where T: Clone + Send + Sync + 'static {}

/// What an update function wants done with the entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Write<V> {
    /// Leave the stored value as it is.
    Unchanged,
    /// Store a new value.
    Put(V),
    /// Delete the key.
    Remove,
}

impl<V> Write<V> {
    /// `Put` unless `value` is empty, in which case the key is removed.
    pub fn put_or_remove(value: V, is_empty: bool) -> Self {
        if is_empty {
            Write::Remove
        } else {
            Write::Put(value)
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Write::Unchanged)
    }
}

/// Read and atomically update single entries.
///
/// `atomic_update` applies `f` to the current value as one indivisible step
/// relative to every other operation on the same key. `f` must be a pure
/// function of its input: the engine may apply it more than once.
#[async_trait]
pub trait AtomicMap<K: GridKey, V: GridValue>: Send + Sync {
    /// Current value, if any.
    async fn get(&self, key: &K) -> Result<Option<V>>;

    /// Apply `f` atomically and return its result.
    async fn atomic_update<R, F>(&self, key: &K, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: Fn(Option<&V>) -> (Write<V>, R) + Send + Sync + 'static;

    /// Delete the key; returns whether it existed.
    async fn remove(&self, key: &K) -> Result<bool> {
        self.atomic_update(key, |old: Option<&V>| {
            if old.is_some() {
                (Write::Remove, true)
            } else {
                (Write::Unchanged, false)
            }
        })
        .await
    }

    /// Every key currently stored.
    async fn keys(&self) -> Result<Vec<K>>;
}

#[async_trait]
impl<K, V, T> AtomicMap<K, V> for &T
where
    K: GridKey,
    V: GridValue,
    T: AtomicMap<K, V> + ?Sized,
{
    async fn get(&self, key: &K) -> Result<Option<V>> {
        (**self).get(key).await
    }

    async fn atomic_update<R, F>(&self, key: &K, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: Fn(Option<&V>) -> (Write<V>, R) + Send + Sync + 'static,
    {
        (**self).atomic_update(key, f).await
    }

    async fn remove(&self, key: &K) -> Result<bool> {
        (**self).remove(key).await
    }

    async fn keys(&self) -> Result<Vec<K>> {
        (**self).keys().await
    }
}
