// meshnode core — node lifecycle and relay directory
//
// Owns the node's long-lived keypair, the start/stop state machine, and the
// per-node relay directory other peers are pointed at. Routing and
// connectivity live behind `transport::OverlayTransport`; host bindings live
// in the mobile crate.

pub mod config;
pub mod identity;
pub mod node;
pub mod relay;
pub mod store;
pub mod transport;

use thiserror::Error;

pub use config::{IdentityPersistence, NodeConfig};
pub use identity::{parse_key_list, parse_server_key, KeyError, NodeIdentity, NodeKeys};
pub use node::{MeshNode, NodeState, ResourceHandles};
pub use relay::{RelayDirectory, RelaySet};
pub use transport::{NullTransport, OverlayTransport};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Failure to bring a node up. Only `MeshNode::start` returns these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Identity error: {0}")]
    Identity(String),
    #[error("Transport error: {0}")]
    Transport(String),
}

// ============================================================================
// LOGGING
// ============================================================================

/// Install a `tracing` subscriber honouring `RUST_LOG` (default `info`).
/// Safe to call more than once; only the first call takes effect.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
