// Transport seam — the overlay routing engine the node drives
//
// Path setup, packet framing and peer connectivity live on the other side of
// this trait. The node only attaches it on start and detaches it on stop.

use crate::identity::NodeKeys;
use crate::node::ResourceHandles;

/// Overlay routing engine driven by [`crate::MeshNode`]
#[cfg_attr(test, mockall::automock)]
pub trait OverlayTransport: Send + Sync {
    /// Join the mesh as `keys`. Called once per start, before the node is
    /// reported as running. An error aborts the start.
    fn attach(&self, keys: &NodeKeys, resources: &ResourceHandles) -> anyhow::Result<()>;

    /// Leave the mesh. Called once per stop.
    fn detach(&self);

    /// Toggle whether this node forwards traffic for others.
    fn set_relaying_enabled(&self, enabled: bool);
}

/// Transport that joins nothing. Used when the node is embedded without a
/// routing engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl OverlayTransport for NullTransport {
    fn attach(&self, keys: &NodeKeys, resources: &ResourceHandles) -> anyhow::Result<()> {
        tracing::debug!(
            public_key = %keys.identity(),
            storage = %resources.storage_dir.display(),
            "No overlay transport configured"
        );
        Ok(())
    }

    fn detach(&self) {}

    fn set_relaying_enabled(&self, enabled: bool) {
        tracing::debug!(enabled, "Relaying toggled without an overlay transport");
    }
}
