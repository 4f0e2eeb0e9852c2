//! Lock-striped per-member storage.

use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// A stored value with the grid-wide version of the write that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Versioned<V> {
    pub value: V,
    pub version: u64,
}

/// Seeded hash used for shard and owner selection.
pub(crate) fn seeded_hash<T: Hash + ?Sized>(seed: u64, value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

/// A map split into independently locked shards.
pub(crate) struct ShardedStore<K, V> {
    shards: Vec<Mutex<HashMap<K, Versioned<V>>>>,
    seed: u64,
}

impl<K: Hash + Eq + Clone, V: Clone> ShardedStore<K, V> {
    pub fn new(shards: usize, seed: u64) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| Mutex::new(HashMap::new())).collect(),
            seed,
        }
    }

    fn shard(&self, key: &K) -> &Mutex<HashMap<K, Versioned<V>>> {
        let index = (seeded_hash(self.seed, key) as usize) % self.shards.len();
        &self.shards[index]
    }

    pub fn get(&self, key: &K) -> Option<Versioned<V>> {
        self.shard(key).lock().get(key).cloned()
    }

    pub fn version(&self, key: &K) -> Option<u64> {
        self.shard(key).lock().get(key).map(|e| e.version)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.shard(key).lock().contains_key(key)
    }

    pub fn put(&self, key: K, entry: Versioned<V>) {
        self.shard(&key).lock().insert(key, entry);
    }

    pub fn remove(&self, key: &K) -> Option<Versioned<V>> {
        self.shard(key).lock().remove(key)
    }

    pub fn entries(&self) -> Vec<(K, Versioned<V>)> {
        self.shards
            .iter()
            .flat_map(|shard| {
                shard
                    .lock()
                    .iter()
                    .map(|(k, e)| (k.clone(), e.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn keys(&self) -> Vec<K> {
        self.shards
            .iter()
            .flat_map(|shard| shard.lock().keys().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }
}
