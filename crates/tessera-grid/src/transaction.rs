//! Explicit transactions over the grid.
//!
//! A [`Transaction`] stages writes locally and implements [`AtomicMap`], so any
//! code written against the map runs unchanged inside one. Nothing is visible to
//! other callers until [`Transaction::commit`]; [`Transaction::rollback`] or
//! dropping the transaction discards every staged write.

use crate::codec::Codec;
use crate::error::{GridError, Result};
use crate::grid::GridNode;
use crate::lock::LockOwner;
use crate::map::{AtomicMap, GridKey, GridValue, Write};
use crate::store::Versioned;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// What a transaction sees of data committed by others.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Every read sees the latest committed value.
    ReadCommitted,
    /// The first read of a key is pinned for the rest of the transaction.
    #[default]
    RepeatableRead,
}

/// How conflicting writers are detected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockingMode {
    /// Versions are checked at commit; a concurrent change fails the commit.
    #[default]
    Optimistic,
    /// Keys are locked on first write and held until commit or rollback.
    Pessimistic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOptions {
    pub isolation: IsolationLevel,
    pub locking: LockingMode,
}

impl TransactionOptions {
    pub fn new(isolation: IsolationLevel, locking: LockingMode) -> Self {
        Self { isolation, locking }
    }
}

struct TxState<K, V> {
    active: bool,
    /// Committed entry first observed for each key; `None` = absent.
    observed: HashMap<K, Option<Versioned<V>>>,
    /// Staged writes; `None` stages a removal.
    staged: HashMap<K, Option<V>>,
    order: Vec<K>,
    locked: HashSet<K>,
}

pub struct Transaction<K: GridKey, V: GridValue, C: Codec<V>> {
    node: GridNode<K, V, C>,
    id: LockOwner,
    options: TransactionOptions,
    state: Mutex<TxState<K, V>>,
}

impl<K: GridKey, V: GridValue, C: Codec<V>> Transaction<K, V, C> {
    pub(crate) fn new(node: GridNode<K, V, C>, options: TransactionOptions) -> Self {
        let id = node.inner.next_lock_owner();
        debug!(tx = id, node = %node.id(), ?options, "transaction started");
        Self {
            node,
            id,
            options,
            state: Mutex::new(TxState {
                active: true,
                observed: HashMap::new(),
                staged: HashMap::new(),
                order: Vec::new(),
                locked: HashSet::new(),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn options(&self) -> TransactionOptions {
        self.options
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state.lock().active {
            Ok(())
        } else {
            Err(GridError::TransactionNotActive(self.id))
        }
    }

    /// Value of `key` as this transaction sees it.
    fn view(&self, key: &K) -> Result<Option<V>> {
        {
            let state = self.state.lock();
            if !state.active {
                return Err(GridError::TransactionNotActive(self.id));
            }
            if let Some(staged) = state.staged.get(key) {
                return Ok(staged.clone());
            }
            if self.options.isolation == IsolationLevel::RepeatableRead {
                if let Some(pinned) = state.observed.get(key) {
                    return Ok(pinned.as_ref().map(|e| e.value.clone()));
                }
            }
        }

        let committed = self.node.inner.read(self.node.id(), key)?;
        let mut state = self.state.lock();
        state
            .observed
            .entry(key.clone())
            .or_insert_with(|| committed.clone());
        Ok(committed.map(|e| e.value))
    }

    fn stage(&self, key: &K, value: Option<V>) {
        let mut state = self.state.lock();
        if state.staged.insert(key.clone(), value).is_none() {
            state.order.push(key.clone());
        }
    }

    async fn lock_key(&self, key: &K) -> Result<()> {
        let timeout = self.node.inner.config().lock_timeout();
        if self.node.inner.locks.acquire(key, self.id, timeout).await? {
            self.state.lock().locked.insert(key.clone());
        }
        Ok(())
    }

    fn release_all(&self) {
        let mut state = self.state.lock();
        state.active = false;
        for key in state.locked.drain() {
            self.node.inner.locks.release(&key, self.id);
        }
    }

    /// Applies every staged write, or none of them.
    pub async fn commit(self) -> Result<()> {
        self.ensure_active()?;
        let order = self.state.lock().order.clone();

        for key in &order {
            if let Err(err) = self.lock_key(key).await {
                self.release_all();
                return Err(err);
            }
        }

        let (writes, observed) = {
            let mut state = self.state.lock();
            let mut staged = std::mem::take(&mut state.staged);
            let writes: Vec<(K, Option<V>)> = order
                .iter()
                .filter_map(|k| staged.remove(k).map(|v| (k.clone(), v)))
                .collect();
            (writes, std::mem::take(&mut state.observed))
        };

        if self.options.locking == LockingMode::Optimistic {
            for (key, _) in &writes {
                let expected = observed
                    .get(key)
                    .and_then(|e| e.as_ref().map(|e| e.version))
                    .unwrap_or(0);
                let actual = self.node.inner.committed_version(key);
                if expected != actual {
                    warn!(tx = self.id, ?key, expected, actual, "write conflict");
                    self.release_all();
                    return Err(GridError::WriteConflict(format!("{key:?}")));
                }
            }
        }

        let count = writes.len();
        let writes = writes
            .into_iter()
            .map(|(key, value)| match value {
                Some(v) => (key, Write::Put(v)),
                None => (key, Write::Remove),
            })
            .collect();
        let installed = self.node.inner.commit_writes(writes);
        self.release_all();
        match installed {
            Ok(()) => {
                debug!(tx = self.id, writes = count, "transaction committed");
                Ok(())
            }
            Err(err) => {
                warn!(tx = self.id, %err, "commit failed, nothing applied");
                Err(err)
            }
        }
    }

    /// Discards every staged write and releases held locks.
    pub fn rollback(self) {
        self.release_all();
        debug!(tx = self.id, "transaction rolled back");
    }
}

impl<K: GridKey, V: GridValue, C: Codec<V>> Drop for Transaction<K, V, C> {
    fn drop(&mut self) {
        if self.state.lock().active {
            self.release_all();
            debug!(tx = self.id, "transaction dropped without commit");
        }
    }
}

#[async_trait]
impl<K: GridKey, V: GridValue, C: Codec<V>> AtomicMap<K, V> for Transaction<K, V, C> {
    async fn get(&self, key: &K) -> Result<Option<V>> {
        self.view(key)
    }

    async fn atomic_update<R, F>(&self, key: &K, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: Fn(Option<&V>) -> (Write<V>, R) + Send + Sync + 'static,
    {
        self.ensure_active()?;
        if self.options.locking == LockingMode::Pessimistic {
            self.lock_key(key).await?;
        }
        let current = self.view(key)?;
        let (write, result) = f(current.as_ref());
        match write {
            Write::Unchanged => {}
            Write::Put(value) => self.stage(key, Some(value)),
            Write::Remove => self.stage(key, None),
        }
        Ok(result)
    }

    async fn keys(&self) -> Result<Vec<K>> {
        self.ensure_active()?;
        let committed = self.node.keys().await?;
        let state = self.state.lock();
        let mut keys: Vec<K> = committed
            .into_iter()
            .filter(|k| !matches!(state.staged.get(k), Some(None)))
            .collect();
        for key in &state.order {
            if matches!(state.staged.get(key), Some(Some(_))) && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::config::GridConfig;
    use crate::grid::Grid;
    use std::time::Duration;

    fn grid() -> Grid<String, i64> {
        Grid::new(
            GridConfig::builder()
                .nodes(2)
                .owners(2)
                .lock_timeout(Duration::from_millis(50))
                .build(),
        )
    }

    fn add(delta: i64) -> impl Fn(Option<&i64>) -> (Write<i64>, i64) + Send + Sync {
        move |old| {
            let next = old.copied().unwrap_or(0) + delta;
            (Write::Put(next), next)
        }
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let g = grid();
        let node = g.nodes()[0].clone();
        let other = g.nodes()[1].clone();
        let key = "counter".to_string();

        let tx = node.begin(TransactionOptions::default());
        assert_eq!(tx.atomic_update(&key, add(5)).await.unwrap(), 5);
        assert_eq!(tx.atomic_update(&key, add(1)).await.unwrap(), 6);
        assert_eq!(tx.get(&key).await.unwrap(), Some(6));
        assert_eq!(other.get(&key).await.unwrap(), None);

        tx.commit().await.unwrap();
        assert_eq!(other.get(&key).await.unwrap(), Some(6));
    }

    /// JSON, except that negative numbers cannot be encoded.
    struct NonNegativeCodec;

    impl Codec<i64> for NonNegativeCodec {
        fn encode(&self, value: &i64) -> Result<Vec<u8>> {
            if *value < 0 {
                return Err(GridError::Codec(format!("negative value {value}")));
            }
            JsonCodec.encode(value)
        }

        fn decode(&self, bytes: &[u8]) -> Result<i64> {
            JsonCodec.decode(bytes)
        }
    }

    #[tokio::test]
    async fn test_failed_commit_applies_nothing() {
        let g = Grid::with_codec(GridConfig::builder().nodes(3).owners(2).build(), NonNegativeCodec);
        let node = g.nodes()[0].clone();
        let other = g.nodes()[2].clone();
        let (a, b, c) = ("a".to_string(), "b".to_string(), "c".to_string());
        node.atomic_update(&a, add(5)).await.unwrap();
        node.atomic_update(&c, add(1)).await.unwrap();

        let tx = node.begin(TransactionOptions::default());
        tx.atomic_update(&a, add(1)).await.unwrap();
        tx.remove(&c).await.unwrap();
        tx.atomic_update(&b, add(-1)).await.unwrap();
        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, GridError::Codec(_)));

        for reader in [&node, &other] {
            assert_eq!(reader.get(&a).await.unwrap(), Some(5));
            assert_eq!(reader.get(&b).await.unwrap(), None);
            assert_eq!(reader.get(&c).await.unwrap(), Some(1));
        }
        // Locks were released with the failed commit.
        assert_eq!(other.atomic_update(&a, add(1)).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_writes() {
        let g = grid();
        let node = g.nodes()[0].clone();
        let key = "counter".to_string();
        node.atomic_update(&key, add(1)).await.unwrap();

        let tx = node.begin(TransactionOptions::default());
        tx.atomic_update(&key, add(10)).await.unwrap();
        assert!(tx.remove(&key).await.unwrap());
        assert_eq!(tx.get(&key).await.unwrap(), None);
        tx.rollback();
        assert_eq!(node.get(&key).await.unwrap(), Some(1));

        {
            let tx = node.begin(TransactionOptions::default());
            tx.atomic_update(&key, add(10)).await.unwrap();
        }
        assert_eq!(node.get(&key).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn test_repeatable_read_pins_first_read() {
        let g = grid();
        let node = g.nodes()[0].clone();
        let key = "counter".to_string();
        node.atomic_update(&key, add(1)).await.unwrap();

        let rr = node.begin(TransactionOptions::new(
            IsolationLevel::RepeatableRead,
            LockingMode::Optimistic,
        ));
        let rc = node.begin(TransactionOptions::new(
            IsolationLevel::ReadCommitted,
            LockingMode::Optimistic,
        ));
        assert_eq!(rr.get(&key).await.unwrap(), Some(1));
        assert_eq!(rc.get(&key).await.unwrap(), Some(1));

        node.atomic_update(&key, add(1)).await.unwrap();
        assert_eq!(rr.get(&key).await.unwrap(), Some(1));
        assert_eq!(rc.get(&key).await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_optimistic_conflict_fails_commit() {
        let g = grid();
        let node = g.nodes()[0].clone();
        let key = "counter".to_string();
        node.atomic_update(&key, add(1)).await.unwrap();

        let tx = node.begin(TransactionOptions::default());
        tx.atomic_update(&key, add(10)).await.unwrap();
        node.atomic_update(&key, add(100)).await.unwrap();

        let err = tx.commit().await.unwrap_err();
        assert!(matches!(err, GridError::WriteConflict(_)));
        assert_eq!(node.get(&key).await.unwrap(), Some(101));
        assert_eq!(g.owners(&key).len(), 2);
    }

    #[tokio::test]
    async fn test_pessimistic_lock_blocks_other_writers() {
        let g = grid();
        let node = g.nodes()[0].clone();
        let key = "counter".to_string();

        let tx = node.begin(TransactionOptions::new(
            IsolationLevel::RepeatableRead,
            LockingMode::Pessimistic,
        ));
        tx.atomic_update(&key, add(1)).await.unwrap();

        let err = g.nodes()[1].atomic_update(&key, add(1)).await.unwrap_err();
        assert!(matches!(err, GridError::LockTimeout { .. }));

        tx.commit().await.unwrap();
        assert_eq!(node.atomic_update(&key, add(1)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_finished_transaction_rejects_reads() {
        let g = grid();
        let node = g.nodes()[0].clone();
        let tx = node.begin(TransactionOptions::default());
        assert!(tx.is_active());
        tx.release_all();
        assert!(matches!(
            tx.get(&"k".to_string()).await,
            Err(GridError::TransactionNotActive(_))
        ));
    }

    #[tokio::test]
    async fn test_keys_include_staged() {
        let g = grid();
        let node = g.nodes()[0].clone();
        node.atomic_update(&"a".to_string(), add(1)).await.unwrap();
        let tx = node.begin(TransactionOptions::default());
        tx.atomic_update(&"b".to_string(), add(1)).await.unwrap();
        tx.remove(&"a".to_string()).await.unwrap();
        assert_eq!(tx.keys().await.unwrap(), vec!["b".to_string()]);
    }
}
