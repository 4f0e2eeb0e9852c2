//! Grid-wide key lock table with acquisition timeout.

use crate::error::{GridError, Result};
use crate::map::GridKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{trace, warn};

/// Identifies who holds a lock: a single operation or a transaction.
pub(crate) type LockOwner = u64;

pub(crate) struct LockTable<K> {
    held: Mutex<HashMap<K, LockOwner>>,
    released: Notify,
}

impl<K: GridKey> LockTable<K> {
    pub fn new() -> Self {
        Self {
            held: Mutex::new(HashMap::new()),
            released: Notify::new(),
        }
    }

    /// Waits until `key` is free or already held by `owner`.
    ///
    /// Returns `true` if this call took the lock, `false` if `owner` already had it.
    pub async fn acquire(&self, key: &K, owner: LockOwner, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut held = self.held.lock();
                let holder = held.get(key).copied();
                match holder {
                    None => {
                        held.insert(key.clone(), owner);
                        trace!(?key, owner, "lock acquired");
                        return Ok(true);
                    }
                    Some(h) if h == owner => return Ok(false),
                    Some(h) => trace!(?key, owner, holder = h, "waiting for lock"),
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                warn!(?key, owner, "lock acquisition timed out");
                return Err(GridError::LockTimeout {
                    key: format!("{key:?}"),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }
    }

    /// Releases `key` if `owner` holds it and wakes every waiter.
    pub fn release(&self, key: &K, owner: LockOwner) {
        let mut held = self.held.lock();
        if held.get(key) == Some(&owner) {
            held.remove(key);
            drop(held);
            trace!(?key, owner, "lock released");
            self.released.notify_waiters();
        }
    }

    pub fn holder(&self, key: &K) -> Option<LockOwner> {
        self.held.lock().get(key).copied()
    }

    /// Takes `key` for the lifetime of the returned guard.
    pub async fn lock(&self, key: &K, owner: LockOwner, timeout: Duration) -> Result<KeyGuard<'_, K>> {
        self.acquire(key, owner, timeout).await?;
        Ok(KeyGuard {
            table: self,
            key: key.clone(),
            owner,
        })
    }
}

/// Releases its key on drop.
pub(crate) struct KeyGuard<'a, K: GridKey> {
    table: &'a LockTable<K>,
    key: K,
    owner: LockOwner,
}

impl<K: GridKey> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        self.table.release(&self.key, self.owner);
    }
}
