//! In-process clustered grid.
//!
//! Each key is owned by `owners` members chosen by rendezvous hashing; the first
//! owner is the primary. Updates run at the primary under the key lock, and the
//! encoded result is installed on every backup before the call returns, so a
//! read from any member observes the write once the future completes.
//! Non-owners may keep a near-cache copy, dropped whenever the key changes.

use crate::codec::{Codec, JsonCodec};
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::lock::{LockOwner, LockTable};
use crate::map::{AtomicMap, GridKey, GridValue, Write};
use crate::store::{seeded_hash, ShardedStore, Versioned};
use crate::transaction::{Transaction, TransactionOptions};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Identifier of a grid member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

struct Member<K, V> {
    id: NodeId,
    data: ShardedStore<K, V>,
    near: ShardedStore<K, V>,
}

impl<K: GridKey, V: GridValue> Member<K, V> {
    fn new(id: NodeId, config: &GridConfig) -> Self {
        Self {
            id,
            data: ShardedStore::new(config.shards, config.hash_seed),
            near: ShardedStore::new(config.shards, config.hash_seed),
        }
    }
}

struct Topology<K, V> {
    members: Vec<Arc<Member<K, V>>>,
}

impl<K: GridKey, V: GridValue> Topology<K, V> {
    fn member(&self, id: NodeId) -> Result<&Arc<Member<K, V>>> {
        self.members
            .iter()
            .find(|m| m.id == id)
            .ok_or(GridError::UnknownNode(id))
    }
}

/// A write ready to install; encoding already succeeded.
enum Prepared<V> {
    Unchanged,
    Put { value: V, copies: Vec<V>, bytes: usize },
    Remove,
}

pub(crate) struct GridInner<K, V, C> {
    config: GridConfig,
    codec: C,
    topology: RwLock<Topology<K, V>>,
    pub(crate) locks: LockTable<K>,
    next_node: AtomicU32,
    next_version: AtomicU64,
    next_owner: AtomicU64,
}

impl<K: GridKey, V: GridValue, C: Codec<V>> GridInner<K, V, C> {
    pub(crate) fn config(&self) -> &GridConfig {
        &self.config
    }

    pub(crate) fn next_lock_owner(&self) -> LockOwner {
        self.next_owner.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Owners of `key` in preference order, highest rendezvous weight first.
    fn owners_in<'t>(&self, topology: &'t Topology<K, V>, key: &K) -> Vec<&'t Arc<Member<K, V>>> {
        let mut weighted: Vec<(u64, &Arc<Member<K, V>>)> = topology
            .members
            .iter()
            .map(|m| (seeded_hash(self.config.hash_seed, &(m.id, key)), m))
            .collect();
        weighted.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
        let n = self.config.owners_for(weighted.len());
        weighted.into_iter().take(n).map(|(_, m)| m).collect()
    }

    /// Committed entry as seen from `origin`.
    pub(crate) fn read(&self, origin: NodeId, key: &K) -> Result<Option<Versioned<V>>> {
        let topology = self.topology.read();
        let me = topology.member(origin)?;
        let owners = self.owners_in(&topology, key);
        if owners.iter().any(|o| o.id == origin) {
            return Ok(me.data.get(key));
        }

        if self.config.near_cache {
            if let Some(hit) = me.near.get(key) {
                trace!(node = %origin, ?key, "near-cache hit");
                return Ok(Some(hit));
            }
        }
        let primary = owners[0];
        trace!(node = %origin, primary = %primary.id, ?key, "remote read");
        let entry = primary.data.get(key);
        if self.config.near_cache {
            if let Some(e) = &entry {
                self.fill_near(me, primary, key, e);
            }
        }
        Ok(entry)
    }

    /// Caches `entry` on `me`, unless the primary moved past it meanwhile.
    ///
    /// A write that lands between the primary read and the put has already
    /// cleared the near-caches, so the copy is re-checked after it is stored.
    fn fill_near(&self, me: &Member<K, V>, primary: &Member<K, V>, key: &K, entry: &Versioned<V>) {
        me.near.put(key.clone(), entry.clone());
        if primary.data.version(key) != Some(entry.version) {
            me.near.remove(key);
            trace!(node = %me.id, ?key, version = entry.version, "stale near-cache fill dropped");
        }
    }

    /// Version of the committed entry, 0 if absent.
    pub(crate) fn committed_version(&self, key: &K) -> u64 {
        let topology = self.topology.read();
        self.owners_in(&topology, key)
            .first()
            .and_then(|primary| primary.data.version(key))
            .unwrap_or(0)
    }

    /// Runs `f` at the primary owner. The caller holds the key lock.
    pub(crate) fn apply<R, F>(&self, origin: NodeId, key: &K, f: &F) -> Result<R>
    where
        F: Fn(Option<&V>) -> (Write<V>, R),
    {
        let topology = self.topology.read();
        topology.member(origin)?;
        let owners = self.owners_in(&topology, key);
        let primary = owners[0];
        if primary.id != origin {
            trace!(node = %origin, primary = %primary.id, ?key, "routing update to primary");
        }
        let current = primary.data.get(key);
        let (write, result) = f(current.as_ref().map(|e| &e.value));
        let prepared = self.prepare(owners.len() - 1, write)?;
        self.install(&topology, &owners, key, prepared);
        Ok(result)
    }

    /// Installs a batch of writes: all of them, or none if any fails to encode.
    pub(crate) fn commit_writes(&self, writes: Vec<(K, Write<V>)>) -> Result<()> {
        let topology = self.topology.read();
        let prepared = writes
            .into_iter()
            .map(|(key, write)| {
                let backups = self.owners_in(&topology, &key).len() - 1;
                Ok((key, self.prepare(backups, write)?))
            })
            .collect::<Result<Vec<_>>>()?;
        for (key, prepared) in prepared {
            let owners = self.owners_in(&topology, &key);
            self.install(&topology, &owners, &key, prepared);
        }
        Ok(())
    }

    /// Encodes `write` and decodes one copy per backup. Touches no member.
    fn prepare(&self, backups: usize, write: Write<V>) -> Result<Prepared<V>> {
        Ok(match write {
            Write::Unchanged => Prepared::Unchanged,
            Write::Put(value) => {
                let bytes = self.codec.encode(&value)?;
                let copies = (0..backups)
                    .map(|_| self.codec.decode(&bytes))
                    .collect::<Result<Vec<V>>>()?;
                Prepared::Put {
                    value,
                    copies,
                    bytes: bytes.len(),
                }
            }
            Write::Remove => Prepared::Remove,
        })
    }

    /// Installs a prepared write on the primary and all backups, then drops near-cache copies.
    fn install(
        &self,
        topology: &Topology<K, V>,
        owners: &[&Arc<Member<K, V>>],
        key: &K,
        prepared: Prepared<V>,
    ) {
        match prepared {
            Prepared::Unchanged => return,
            Prepared::Put { value, copies, bytes } => {
                let version = self.next_version.fetch_add(1, Ordering::Relaxed) + 1;
                owners[0].data.put(key.clone(), Versioned { value, version });
                for (backup, copy) in owners[1..].iter().zip(copies) {
                    backup.data.put(key.clone(), Versioned { value: copy, version });
                }
                trace!(?key, version, backups = owners.len() - 1, bytes, "replicated");
            }
            Prepared::Remove => {
                for owner in owners {
                    owner.data.remove(key);
                }
                trace!(?key, "removed from owners");
            }
        }

        if self.config.near_cache {
            for member in &topology.members {
                if member.near.remove(key).is_some() {
                    trace!(node = %member.id, ?key, "near-cache invalidated");
                }
            }
        }
    }

    fn keys(&self) -> Vec<K> {
        let topology = self.topology.read();
        let mut seen = HashSet::new();
        topology
            .members
            .iter()
            .flat_map(|m| m.data.keys())
            .filter(|k| seen.insert(k.clone()))
            .collect()
    }

    /// Moves every key to its owners under the current topology.
    fn rebalance(&self, topology: &Topology<K, V>, departed: Option<&Member<K, V>>) -> Result<usize> {
        let mut freshest: HashMap<K, Versioned<V>> = HashMap::new();
        let sources = topology.members.iter().map(|m| &**m).chain(departed);
        for member in sources {
            for (key, entry) in member.data.entries() {
                let newer = freshest
                    .get(&key)
                    .map_or(true, |current| entry.version > current.version);
                if newer {
                    freshest.insert(key, entry);
                }
            }
        }

        let mut moved = 0;
        for (key, entry) in freshest {
            let owners = self.owners_in(topology, &key);
            let bytes = self.codec.encode(&entry.value)?;
            for member in &topology.members {
                if owners.iter().any(|o| o.id == member.id) {
                    if member.data.version(&key) != Some(entry.version) {
                        let value = self.codec.decode(&bytes)?;
                        member.data.put(
                            key.clone(),
                            Versioned {
                                value,
                                version: entry.version,
                            },
                        );
                        moved += 1;
                    }
                } else {
                    member.data.remove(&key);
                }
            }
        }
        for member in &topology.members {
            member.near.clear();
        }
        Ok(moved)
    }
}

/// A cluster of in-process members sharing one keyspace.
///
/// # Example
///
/// ```rust
/// use tessera_grid::{AtomicMap, Grid, GridConfig, Write};
///
/// # tokio_test::block_on(async {
/// let grid: Grid<String, Vec<i32>> = Grid::new(GridConfig::builder().nodes(3).build());
/// let node = grid.nodes()[0].clone();
///
/// let len = node
///     .atomic_update(&"k".to_string(), |old: Option<&Vec<i32>>| {
///         let mut list = old.cloned().unwrap_or_default();
///         list.push(1);
///         let len = list.len();
///         (Write::Put(list), len)
///     })
///     .await
///     .unwrap();
/// assert_eq!(len, 1);
/// # });
/// ```
pub struct Grid<K, V, C = JsonCodec> {
    inner: Arc<GridInner<K, V, C>>,
}

impl<K, V, C> Clone for Grid<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: GridKey, V: GridValue + Serialize + serde::de::DeserializeOwned> Grid<K, V, JsonCodec> {
    /// Create a grid that ships values as JSON.
    pub fn new(config: GridConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<K: GridKey, V: GridValue, C: Codec<V>> Grid<K, V, C> {
    pub fn with_codec(config: GridConfig, codec: C) -> Self {
        let nodes = config.nodes.max(1);
        let members = (0..nodes)
            .map(|i| Arc::new(Member::new(NodeId(i as u32), &config)))
            .collect();
        info!(nodes, owners = config.owners, near_cache = config.near_cache, "grid started");
        Self {
            inner: Arc::new(GridInner {
                config,
                codec,
                topology: RwLock::new(Topology { members }),
                locks: LockTable::new(),
                next_node: AtomicU32::new(nodes as u32),
                next_version: AtomicU64::new(0),
                next_owner: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.inner.config
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.inner.topology.read().members.iter().map(|m| m.id).collect()
    }

    /// Handle for a member.
    pub fn node(&self, id: NodeId) -> Result<GridNode<K, V, C>> {
        self.inner.topology.read().member(id)?;
        Ok(GridNode {
            id,
            inner: self.inner.clone(),
        })
    }

    pub fn nodes(&self) -> Vec<GridNode<K, V, C>> {
        self.node_ids()
            .into_iter()
            .map(|id| GridNode {
                id,
                inner: self.inner.clone(),
            })
            .collect()
    }

    /// Owners of `key`, primary first.
    pub fn owners(&self, key: &K) -> Vec<NodeId> {
        let topology = self.inner.topology.read();
        self.inner
            .owners_in(&topology, key)
            .into_iter()
            .map(|m| m.id)
            .collect()
    }

    /// Add a member and move keys to their new owners.
    pub fn join(&self) -> Result<GridNode<K, V, C>> {
        let id = NodeId(self.inner.next_node.fetch_add(1, Ordering::Relaxed));
        let mut topology = self.inner.topology.write();
        topology
            .members
            .push(Arc::new(Member::new(id, &self.inner.config)));
        let moved = self.inner.rebalance(&topology, None)?;
        info!(node = %id, members = topology.members.len(), moved, "node joined");
        Ok(GridNode {
            id,
            inner: self.inner.clone(),
        })
    }

    /// Remove a member; its keys are copied to the remaining owners first.
    pub fn leave(&self, id: NodeId) -> Result<()> {
        let mut topology = self.inner.topology.write();
        let position = topology
            .members
            .iter()
            .position(|m| m.id == id)
            .ok_or(GridError::UnknownNode(id))?;
        if topology.members.len() == 1 {
            return Err(GridError::LastMember(id));
        }
        let departed = topology.members.remove(position);
        let moved = self.inner.rebalance(&topology, Some(departed.as_ref()))?;
        info!(node = %id, members = topology.members.len(), moved, "node left");
        Ok(())
    }

    /// Whether `node` holds an owner copy of `key`.
    pub fn stored_on(&self, node: NodeId, key: &K) -> bool {
        let topology = self.inner.topology.read();
        topology
            .member(node)
            .map(|m| m.data.contains(key))
            .unwrap_or(false)
    }

    /// Whether `node` holds a near-cache copy of `key`.
    pub fn near_cached_on(&self, node: NodeId, key: &K) -> bool {
        let topology = self.inner.topology.read();
        topology
            .member(node)
            .map(|m| m.near.contains(key))
            .unwrap_or(false)
    }

    /// Number of owner copies held by `node`.
    pub fn entries_on(&self, node: NodeId) -> usize {
        let topology = self.inner.topology.read();
        topology.member(node).map(|m| m.data.len()).unwrap_or(0)
    }
}

/// One member's view of the grid. Cheap to clone.
pub struct GridNode<K, V, C = JsonCodec> {
    id: NodeId,
    pub(crate) inner: Arc<GridInner<K, V, C>>,
}

impl<K, V, C> Clone for GridNode<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: self.inner.clone(),
        }
    }
}

impl<K: GridKey, V: GridValue, C: Codec<V>> GridNode<K, V, C> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Start a transaction on this member.
    pub fn begin(&self, options: TransactionOptions) -> Transaction<K, V, C> {
        Transaction::new(self.clone(), options)
    }
}

#[async_trait]
impl<K: GridKey, V: GridValue, C: Codec<V>> AtomicMap<K, V> for GridNode<K, V, C> {
    async fn get(&self, key: &K) -> Result<Option<V>> {
        Ok(self.inner.read(self.id, key)?.map(|e| e.value))
    }

    async fn atomic_update<R, F>(&self, key: &K, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: Fn(Option<&V>) -> (Write<V>, R) + Send + Sync + 'static,
    {
        let owner = self.inner.next_lock_owner();
        let timeout = self.inner.config.lock_timeout();
        let _guard = self.inner.locks.lock(key, owner, timeout).await?;
        debug!(node = %self.id, ?key, "atomic update");
        self.inner.apply(self.id, key, &f)
    }

    async fn keys(&self) -> Result<Vec<K>> {
        self.inner.topology.read().member(self.id)?;
        Ok(self.inner.keys())
    }
}
