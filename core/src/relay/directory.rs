//! Relay directory — which relay servers to advertise for each node
//!
//! Each target node maps to a set of relay identities. A write replaces the
//! whole set; the old set is never merged. The map is split into shards so
//! writers for unrelated targets rarely contend, and each set sits behind an
//! `Arc` so a replace is a pointer swap: readers see the old set or the new
//! one, never a mix.

use crate::identity::{join_keys, parse_key_list, NodeIdentity};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Number of independently locked shards
const SHARD_COUNT: usize = 16;

/// An immutable snapshot of the relays stored for one target.
pub type RelaySet = Arc<HashSet<NodeIdentity>>;

/// Concurrent map from node identity to its relay set
pub struct RelayDirectory {
    shards: Vec<RwLock<HashMap<NodeIdentity, RelaySet>>>,
}

impl RelayDirectory {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, target: &NodeIdentity) -> &RwLock<HashMap<NodeIdentity, RelaySet>> {
        &self.shards[target.as_bytes()[0] as usize % SHARD_COUNT]
    }

    /// Replace the relays for `target` from a comma-separated key list.
    ///
    /// Tokens that are not valid keys are dropped; the rest are stored even
    /// if some of the batch was malformed.
    pub fn set(&self, target: NodeIdentity, relays: &str) {
        self.replace(target, parse_key_list(relays));
    }

    /// Replace the relays for `target`.
    pub fn set_relays<I>(&self, target: NodeIdentity, relays: I)
    where
        I: IntoIterator<Item = NodeIdentity>,
    {
        self.replace(target, relays.into_iter().collect());
    }

    fn replace(&self, target: NodeIdentity, relays: HashSet<NodeIdentity>) {
        let count = relays.len();
        let relays = Arc::new(relays);
        // The previous set is freed after the shard lock is released.
        let _previous = self.shard(&target).write().insert(target, relays);
        tracing::debug!(node = %target, relays = count, "Relay set replaced");
    }

    /// Current relay set for `target`, if one was ever stored.
    pub fn snapshot(&self, target: &NodeIdentity) -> Option<RelaySet> {
        self.shard(target).read().get(target).cloned()
    }

    /// Relays for `target` in no particular order. Empty if none stored.
    pub fn get(&self, target: &NodeIdentity) -> Vec<NodeIdentity> {
        self.snapshot(target)
            .map(|relays| relays.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Relays for `target` as a comma-separated list of hex keys.
    pub fn get_joined(&self, target: &NodeIdentity) -> String {
        join_keys(self.get(target))
    }

    /// Number of targets with a stored relay set
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Drop every stored relay set
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
    }
}

impl Default for RelayDirectory {
    fn default() -> Self {
        Self::new()
    }
}
