// Node lifecycle — identity, resources and the relay directory for one node
//
// Stopped ──start──▶ Running ──stop──▶ Stopped
//
// start/stop are serialized by the lifecycle mutex. Relay reads and writes
// only take the `active` read lock long enough to clone the directory handle,
// so they never wait on a transition in progress.

mod resources;

pub use resources::ResourceHandles;
use resources::ResourceScope;

use crate::config::NodeConfig;
use crate::identity::{parse_server_key, IdentityManager, NodeIdentity, NodeKeys};
use crate::relay::RelayDirectory;
use crate::transport::{NullTransport, OverlayTransport};
use crate::NodeError;
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Stopped,
    Running,
}

/// Everything owned by one running period.
struct Session {
    keys: NodeKeys,
    _resources: ResourceScope,
}

/// The parts of a running node that relay operations read.
#[derive(Clone)]
struct ActiveNode {
    identity: NodeIdentity,
    directory: Arc<RelayDirectory>,
}

/// A mesh node: its identity, its relay directory and the transport it drives.
pub struct MeshNode {
    config: NodeConfig,
    transport: Arc<dyn OverlayTransport>,
    /// Held for the whole of start/stop
    lifecycle: Mutex<Option<Session>>,
    active: RwLock<Option<ActiveNode>>,
    relaying_enabled: AtomicBool,
}

impl MeshNode {
    /// Node without an overlay transport
    pub fn new(config: NodeConfig) -> Self {
        Self::with_transport(config, Arc::new(NullTransport))
    }

    pub fn with_transport(config: NodeConfig, transport: Arc<dyn OverlayTransport>) -> Self {
        let relaying_enabled = AtomicBool::new(config.relaying_enabled);
        Self {
            config,
            transport,
            lifecycle: Mutex::new(None),
            active: RwLock::new(None),
            relaying_enabled,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // LIFECYCLE
    // ------------------------------------------------------------------------

    /// Join the mesh using the given storage and cache directories.
    ///
    /// Calling `start` on a running node does nothing and returns `Ok(())`;
    /// the current identity, directory and resources are kept and the new
    /// paths are ignored. If any step fails the node stays stopped and
    /// whatever was acquired is released.
    pub fn start(
        &self,
        storage_dir: impl AsRef<Path>,
        cache_dir: impl AsRef<Path>,
    ) -> Result<(), NodeError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.is_some() {
            tracing::debug!("Mesh node already running; start ignored");
            return Ok(());
        }

        tracing::info!("Mesh node starting...");

        let resources = ResourceScope::acquire(
            storage_dir.as_ref(),
            cache_dir.as_ref(),
            self.config.identity_persistence,
        )?;

        let mut identity = IdentityManager::with_store(resources.identity_store());
        let public_key = identity
            .initialize()
            .map_err(|e| NodeError::Identity(format!("{:#}", e)))?;
        let keys = identity
            .into_keys()
            .ok_or_else(|| NodeError::Identity("no keys after initialization".to_string()))?;

        self.transport
            .set_relaying_enabled(self.relaying_enabled.load(Ordering::SeqCst));
        self.transport
            .attach(&keys, resources.handles())
            .map_err(|e| NodeError::Transport(format!("{:#}", e)))?;

        *self.active.write() = Some(ActiveNode {
            identity: public_key,
            directory: Arc::new(RelayDirectory::new()),
        });
        *lifecycle = Some(Session {
            keys,
            _resources: resources,
        });

        tracing::info!(public_key = %public_key, "Mesh node started");
        Ok(())
    }

    /// Leave the mesh and release resources. No-op when stopped.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let Some(session) = lifecycle.take() else {
            return;
        };

        tracing::info!("Mesh node stopping...");

        if let Some(active) = self.active.write().take() {
            active.directory.clear();
        }
        self.transport.detach();
        drop(session);

        tracing::info!("Mesh node stopped");
    }

    pub fn state(&self) -> NodeState {
        if self.active.read().is_some() {
            NodeState::Running
        } else {
            NodeState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == NodeState::Running
    }

    // ------------------------------------------------------------------------
    // IDENTITY
    // ------------------------------------------------------------------------

    /// This node's public key. `None` while stopped.
    pub fn public_key(&self) -> Option<NodeIdentity> {
        self.active.read().as_ref().map(|active| active.identity)
    }

    /// Run `f` with the node keypair. `None` while stopped.
    pub fn with_keys<R>(&self, f: impl FnOnce(&NodeKeys) -> R) -> Option<R> {
        self.lifecycle.lock().as_ref().map(|session| f(&session.keys))
    }

    // ------------------------------------------------------------------------
    // RELAYS
    // ------------------------------------------------------------------------

    /// Shared handle to the relay directory. `None` while stopped.
    pub fn relay_directory(&self) -> Option<Arc<RelayDirectory>> {
        self.active
            .read()
            .as_ref()
            .map(|active| active.directory.clone())
    }

    /// Replace the relays advertised for `node_key`.
    ///
    /// An unparseable `node_key`, or a stopped node, makes this a no-op.
    /// Invalid entries in `relays` are dropped.
    pub fn set_relay_servers(&self, node_key: &str, relays: &str) {
        let Some(directory) = self.relay_directory() else {
            tracing::debug!("set_relay_servers ignored: node not running");
            return;
        };
        match parse_server_key(node_key) {
            Ok(target) => directory.set(target, relays),
            Err(e) => tracing::debug!("set_relay_servers ignored for {:?}: {}", node_key, e),
        }
    }

    /// Relays advertised for `node_key` as a comma-separated list.
    ///
    /// Empty when nothing is stored, `node_key` is unparseable, or the node
    /// is stopped.
    pub fn get_relay_servers(&self, node_key: &str) -> String {
        let Some(directory) = self.relay_directory() else {
            return String::new();
        };
        match parse_server_key(node_key) {
            Ok(target) => directory.get_joined(&target),
            Err(_) => String::new(),
        }
    }

    /// Offer or withdraw relaying for other nodes. Applies immediately when
    /// running and is remembered for the next start otherwise.
    pub fn set_relaying_enabled(&self, enabled: bool) {
        // Hold the lifecycle lock so a concurrent start can't miss the update.
        let lifecycle = self.lifecycle.lock();
        self.relaying_enabled.store(enabled, Ordering::SeqCst);
        if lifecycle.is_some() {
            self.transport.set_relaying_enabled(enabled);
        }
        tracing::info!(enabled, "Relaying updated");
    }

    pub fn relaying_enabled(&self) -> bool {
        self.relaying_enabled.load(Ordering::SeqCst)
    }
}

impl Default for MeshNode {
    fn default() -> Self {
        Self::new(NodeConfig::default())
    }
}

impl Drop for MeshNode {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockOverlayTransport;
    use mockall::predicate::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn ephemeral_node() -> MeshNode {
        MeshNode::new(NodeConfig::ephemeral())
    }

    #[test]
    fn test_new_node_is_stopped() {
        let node = ephemeral_node();
        assert_eq!(node.state(), NodeState::Stopped);
        assert!(node.public_key().is_none());
        assert!(node.relay_directory().is_none());
    }

    #[test]
    fn test_lifecycle() {
        let dir = tempdir().unwrap();
        let node = ephemeral_node();

        node.start(dir.path().join("s"), dir.path().join("c")).unwrap();
        assert!(node.is_running());
        assert_eq!(node.public_key().unwrap().to_hex().len(), 64);

        node.stop();
        assert!(!node.is_running());
        assert!(node.public_key().is_none());
    }

    #[test]
    fn test_double_start_keeps_identity() {
        let dir = tempdir().unwrap();
        let node = ephemeral_node();

        node.start(dir.path().join("s"), dir.path().join("c")).unwrap();
        let first = node.public_key().unwrap();
        node.start(dir.path().join("other"), dir.path().join("other-c"))
            .unwrap();

        assert_eq!(node.public_key().unwrap(), first);
        assert!(!dir.path().join("other").exists());
    }

    #[test]
    fn test_stop_when_stopped_is_noop() {
        let node = ephemeral_node();
        node.stop();
        node.stop();
        assert_eq!(node.state(), NodeState::Stopped);
    }

    #[test]
    fn test_relay_calls_while_stopped() {
        let node = ephemeral_node();
        let key = "ab".repeat(32);
        node.set_relay_servers(&key, &key);
        assert_eq!(node.get_relay_servers(&key), "");
    }

    #[test]
    fn test_keys_match_public_key() {
        let dir = tempdir().unwrap();
        let node = ephemeral_node();
        assert!(node.with_keys(|k| k.identity()).is_none());

        node.start(dir.path().join("s"), dir.path().join("c")).unwrap();
        assert_eq!(node.with_keys(|k| k.identity()), node.public_key());
    }

    #[test]
    fn test_directory_is_torn_down_on_stop() {
        let dir = tempdir().unwrap();
        let node = ephemeral_node();
        let relay = "cd".repeat(32);

        node.start(dir.path().join("s"), dir.path().join("c")).unwrap();
        let target = node.public_key().unwrap().to_hex();
        node.set_relay_servers(&target, &relay);
        let directory = node.relay_directory().unwrap();
        node.stop();

        assert!(directory.is_empty());
    }

    #[test]
    fn test_concurrent_start_stop_is_serialized() {
        let dir = tempdir().unwrap();
        let storage = dir.path().join("s");
        let cache = dir.path().join("c");
        // Persistent: overlapping starts would collide on the identity DB lock
        let node = Arc::new(MeshNode::new(NodeConfig::default()));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let node = node.clone();
                let (storage, cache) = (storage.clone(), cache.clone());
                std::thread::spawn(move || {
                    let mut seen = Vec::new();
                    for round in 0..20 {
                        if (worker + round) % 2 == 0 {
                            node.start(&storage, &cache).unwrap();
                            seen.extend(node.public_key());
                        } else {
                            node.stop();
                        }
                    }
                    seen
                })
            })
            .collect();

        let mut identities = HashSet::new();
        for handle in handles {
            identities.extend(handle.join().unwrap());
        }

        // Same storage throughout, so every start reloaded the same keypair
        assert_eq!(identities.len(), 1);
        assert_eq!(node.is_running(), node.lifecycle.lock().is_some());

        node.stop();
        assert_eq!(node.state(), NodeState::Stopped);
        assert!(node.lifecycle.lock().is_none());
    }

    #[test]
    fn test_transport_attached_and_detached() {
        let dir = tempdir().unwrap();
        let mut transport = MockOverlayTransport::new();
        transport
            .expect_set_relaying_enabled()
            .with(eq(true))
            .times(1)
            .return_const(());
        transport.expect_attach().times(1).returning(|_, _| Ok(()));
        transport.expect_detach().times(1).return_const(());

        let config = NodeConfig {
            relaying_enabled: true,
            ..NodeConfig::ephemeral()
        };
        let node = MeshNode::with_transport(config, Arc::new(transport));

        node.start(dir.path().join("s"), dir.path().join("c")).unwrap();
        node.stop();
        node.stop();
    }

    #[test]
    fn test_transport_receives_resource_handles() {
        let dir = tempdir().unwrap();
        let storage = dir.path().join("s");
        let cache = dir.path().join("c");
        let expected = ResourceHandles {
            storage_dir: storage.clone(),
            cache_dir: cache.clone(),
        };

        let mut transport = MockOverlayTransport::new();
        transport.expect_set_relaying_enabled().return_const(());
        transport
            .expect_attach()
            .withf(move |_, resources| *resources == expected)
            .times(1)
            .returning(|_, _| Ok(()));
        transport.expect_detach().return_const(());

        let node = MeshNode::with_transport(NodeConfig::ephemeral(), Arc::new(transport));
        node.start(&storage, &cache).unwrap();
    }

    #[test]
    fn test_attach_failure_leaves_node_stopped() {
        let dir = tempdir().unwrap();
        let storage = dir.path().join("s");
        let cache = dir.path().join("c");

        let mut transport = MockOverlayTransport::new();
        transport.expect_set_relaying_enabled().return_const(());
        transport
            .expect_attach()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("no route")));
        transport.expect_detach().never();

        let node = MeshNode::with_transport(NodeConfig::default(), Arc::new(transport));
        let result = node.start(&storage, &cache);

        assert!(matches!(result, Err(NodeError::Transport(_))));
        assert_eq!(node.state(), NodeState::Stopped);
        drop(node);

        // The identity database lock was released with the failed start
        let retry = MeshNode::new(NodeConfig::default());
        retry.start(&storage, &cache).unwrap();
        assert!(retry.is_running());
    }

    #[test]
    fn test_relaying_toggle_forwarded_only_while_running() {
        let dir = tempdir().unwrap();
        let mut transport = MockOverlayTransport::new();
        let mut seq = mockall::Sequence::new();
        // start with the stored value (set while stopped)
        transport
            .expect_set_relaying_enabled()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        transport.expect_attach().returning(|_, _| Ok(()));
        // runtime toggle
        transport
            .expect_set_relaying_enabled()
            .with(eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        transport.expect_detach().return_const(());

        let node = MeshNode::with_transport(NodeConfig::ephemeral(), Arc::new(transport));
        assert!(!node.relaying_enabled());
        node.set_relaying_enabled(true);
        assert!(node.relaying_enabled());

        node.start(dir.path().join("s"), dir.path().join("c")).unwrap();
        node.set_relaying_enabled(false);
        assert!(!node.relaying_enabled());
        node.stop();
    }
}
