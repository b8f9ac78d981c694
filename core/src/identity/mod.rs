// Identity — node keys, canonical public identities and the key codec

mod codec;
mod keys;
mod store;

pub use codec::{join_keys, parse_key_list, parse_server_key, KeyError, RELAY_LIST_DELIMITER};
pub use keys::NodeKeys;
pub use store::IdentityStore;

use anyhow::Result;
use std::fmt;
use std::str::FromStr;

/// Length in bytes of a node public key.
pub const KEY_LENGTH: usize = 32;

/// Public key identifying a mesh participant.
///
/// Displayed as 64 lowercase hex characters. Parsing accepts both the bare
/// and the `@localpart:key` compound form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity([u8; KEY_LENGTH]);

impl NodeIdentity {
    pub const fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    /// Canonical hex form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIdentity({})", self.to_hex())
    }
}

impl FromStr for NodeIdentity {
    type Err = KeyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_server_key(s)
    }
}

/// Loads or creates the node keypair
pub struct IdentityManager {
    store: IdentityStore,
    keys: Option<NodeKeys>,
}

impl IdentityManager {
    pub fn with_store(store: IdentityStore) -> Self {
        Self { store, keys: None }
    }

    /// Load the stored keypair, or generate and store a new one.
    /// Returns the resulting public identity.
    pub fn initialize(&mut self) -> Result<NodeIdentity> {
        let keys = match self.store.load_keys()? {
            Some(keys) => {
                tracing::info!("🔑 Loaded existing node identity");
                keys
            }
            None => {
                tracing::info!("🔑 Generating new node identity");
                let keys = NodeKeys::generate();
                self.store.save_keys(&keys)?;
                keys
            }
        };

        let identity = keys.identity();
        self.keys = Some(keys);
        Ok(identity)
    }

    /// Hand the keys over to the caller
    pub fn into_keys(self) -> Option<NodeKeys> {
        self.keys
    }
}
