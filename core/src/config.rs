// Node configuration

use serde::{Deserialize, Serialize};

/// Whether the node keypair outlives a stop/start cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPersistence {
    /// Keypair is stored under `<storage>/identity` and reloaded on start
    #[default]
    Persistent,
    /// A fresh keypair is generated on every start and never written to disk
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Identity lifetime across restarts
    pub identity_persistence: IdentityPersistence,

    /// Offer to relay traffic for other nodes
    pub relaying_enabled: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            identity_persistence: IdentityPersistence::Persistent,
            relaying_enabled: false,
        }
    }
}

impl NodeConfig {
    /// Config with a throwaway identity
    pub fn ephemeral() -> Self {
        Self {
            identity_persistence: IdentityPersistence::Ephemeral,
            ..Self::default()
        }
    }
}
