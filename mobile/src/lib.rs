// meshnode-mobile — Native mobile bindings for iOS and Android
//
// Exposes the node through UniFFI with a string-only surface: directories
// and keys cross the boundary as plain strings, relay lists as
// comma-separated keys. All node logic stays in meshnode-core.

use meshnode_core::{MeshNode, NodeConfig, NodeError};

uniffi::include_scaffolding!("meshnode");

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Identity error: {0}")]
    Identity(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<NodeError> for MeshError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::Storage(msg) => MeshError::Storage(msg),
            NodeError::Identity(msg) => MeshError::Identity(msg),
            NodeError::Transport(msg) => MeshError::Transport(msg),
        }
    }
}

/// Canonicalize a bare or `@localpart:key` server key to 64 hex chars.
pub fn parse_server_key(key: String) -> Result<String, MeshError> {
    meshnode_core::parse_server_key(&key)
        .map(|id| id.to_hex())
        .map_err(|e| MeshError::InvalidKey(e.to_string()))
}

/// A mesh node bound to one storage and one cache directory.
pub struct MeshNodeHandle {
    node: MeshNode,
    storage_directory: String,
    cache_directory: String,
}

impl MeshNodeHandle {
    /// Node whose identity is kept in `storage_directory` across restarts
    pub fn new(storage_directory: String, cache_directory: String) -> Self {
        Self::with_config(storage_directory, cache_directory, NodeConfig::default())
    }

    /// Node that generates a fresh identity on every start
    pub fn ephemeral(storage_directory: String, cache_directory: String) -> Self {
        Self::with_config(storage_directory, cache_directory, NodeConfig::ephemeral())
    }

    fn with_config(storage_directory: String, cache_directory: String, config: NodeConfig) -> Self {
        meshnode_core::init_logging();
        Self {
            node: MeshNode::new(config),
            storage_directory,
            cache_directory,
        }
    }

    pub fn start(&self) -> Result<(), MeshError> {
        self.node
            .start(&self.storage_directory, &self.cache_directory)
            .map_err(|e| {
                tracing::error!("Mesh node failed to start: {}", e);
                MeshError::from(e)
            })
    }

    pub fn stop(&self) {
        self.node.stop();
    }

    pub fn is_running(&self) -> bool {
        self.node.is_running()
    }

    /// Hex public key, or an empty string while stopped
    pub fn public_key(&self) -> String {
        self.node
            .public_key()
            .map(|key| key.to_hex())
            .unwrap_or_default()
    }

    pub fn set_relay_servers(&self, node_key: String, relay_keys: String) {
        self.node.set_relay_servers(&node_key, &relay_keys);
    }

    pub fn get_relay_servers(&self, node_key: String) -> String {
        self.node.get_relay_servers(&node_key)
    }

    pub fn set_relaying_enabled(&self, enabled: bool) {
        self.node.set_relaying_enabled(enabled);
    }

    pub fn relaying_enabled(&self) -> bool {
        self.node.relaying_enabled()
    }
}
