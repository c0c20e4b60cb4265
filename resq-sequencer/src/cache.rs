#![forbid(unsafe_code)]

//! Thread-safe cache of arrived-but-not-yet-emittable packets.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

/// Concurrent map from sequence id to buffered packet.
///
/// Duplicate stores are last-writer-wins. An entry exists iff the packet has
/// been added but not yet emitted and not dropped by a timeout clear.
pub struct PacketCache<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> PacketCache<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: RwLock::new(HashMap::new()) }
    }

    /// Insert `v` under `k`, replacing any previous entry.
    pub fn store(&self, k: K, v: V) {
        self.inner.write().insert(k, v);
    }

    /// Copy out the entry under `k`, if any.
    pub fn load(&self, k: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().get(k).cloned()
    }

    /// Remove and return the entry under `k`, if any.
    pub fn take(&self, k: &K) -> Option<V> {
        self.inner.write().remove(k)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl<K: Eq + Hash, V> Default for PacketCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
