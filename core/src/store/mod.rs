// Store module — storage backends behind the node's storage directory

pub mod backend;

pub use backend::{MemoryStorage, SledStorage, StorageBackend};
