// Node key management

use super::NodeIdentity;
use anyhow::Result;
use ed25519_dalek::SigningKey;
use zeroize::{Zeroize, Zeroizing};

/// The local node's Ed25519 keypair
#[derive(Clone)]
pub struct NodeKeys {
    pub signing_key: SigningKey,
}

impl NodeKeys {
    /// Generate new node keys
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut secret_key_bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut secret_key_bytes);
        let signing_key = SigningKey::from_bytes(&secret_key_bytes);
        secret_key_bytes.zeroize();
        Self { signing_key }
    }

    /// Public identity of this node
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Serialize the secret key.
    /// Returns a `Zeroizing<Vec<u8>>` that wipes the key material on drop.
    pub fn to_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.signing_key.to_bytes().to_vec())
    }

    /// Deserialize keys from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_bytes(
            bytes
                .try_into()
                .map_err(|_| anyhow::anyhow!("Invalid key bytes"))?,
        );
        Ok(Self { signing_key })
    }
}

impl std::fmt::Debug for NodeKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeKeys")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}
