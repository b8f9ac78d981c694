// Where the node keypair lives between runs

use super::NodeKeys;
use crate::store::backend::StorageBackend;
use anyhow::{anyhow, Result};
use std::sync::Arc;
use zeroize::Zeroizing;

/// Record key of the serialized secret key.
const NODE_KEYS_KEY: &[u8] = b"node_keys";

/// Keypair storage selected by `IdentityPersistence`
#[derive(Clone)]
pub enum IdentityStore {
    /// Nothing is written; every load comes back empty
    Memory,
    Persistent(Arc<dyn StorageBackend>),
}

impl IdentityStore {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn persistent(backend: Arc<dyn StorageBackend>) -> Self {
        Self::Persistent(backend)
    }

    /// Write the secret key and flush it to disk before returning.
    pub fn save_keys(&self, keys: &NodeKeys) -> Result<()> {
        let Self::Persistent(db) = self else {
            return Ok(());
        };
        from_backend(db.put(NODE_KEYS_KEY, &keys.to_bytes()))?;
        from_backend(db.flush())
    }

    /// Stored keypair, if any. A record of the wrong size is an error, not
    /// a reason to silently mint a new identity.
    pub fn load_keys(&self) -> Result<Option<NodeKeys>> {
        let Self::Persistent(db) = self else {
            return Ok(None);
        };
        match from_backend(db.get(NODE_KEYS_KEY))? {
            Some(bytes) => {
                let bytes = Zeroizing::new(bytes);
                Ok(Some(NodeKeys::from_bytes(&bytes)?))
            }
            None => Ok(None),
        }
    }
}

/// Lift a backend's string error into `anyhow`.
fn from_backend<T>(result: std::result::Result<T, String>) -> Result<T> {
    result.map_err(|e| anyhow!("identity store: {}", e))
}
