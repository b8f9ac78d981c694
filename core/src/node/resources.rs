// Scoped storage and cache directories

use crate::config::IdentityPersistence;
use crate::identity::IdentityStore;
use crate::store::{SledStorage, StorageBackend};
use crate::NodeError;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Subdirectory of the storage directory that holds the identity database.
const IDENTITY_DIR: &str = "identity";

/// Storage and cache directories handed to the node on start.
///
/// The node never looks inside these beyond its own identity database; they
/// are forwarded to the overlay transport as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandles {
    pub storage_dir: PathBuf,
    pub cache_dir: PathBuf,
}

/// Owns the directories and open databases for one running period.
/// Dropping it releases them, including on early-return and unwind paths.
pub(crate) struct ResourceScope {
    handles: ResourceHandles,
    identity_db: Option<Arc<SledStorage>>,
}

impl ResourceScope {
    pub(crate) fn acquire(
        storage_dir: &Path,
        cache_dir: &Path,
        persistence: IdentityPersistence,
    ) -> Result<Self, NodeError> {
        create_dir(storage_dir)?;
        create_dir(cache_dir)?;

        let identity_db = match persistence {
            IdentityPersistence::Persistent => {
                let path = storage_dir.join(IDENTITY_DIR);
                let db = SledStorage::open(&path)
                    .map_err(|e| NodeError::Storage(format!("{}: {}", path.display(), e)))?;
                Some(Arc::new(db))
            }
            IdentityPersistence::Ephemeral => None,
        };

        Ok(Self {
            handles: ResourceHandles {
                storage_dir: storage_dir.to_path_buf(),
                cache_dir: cache_dir.to_path_buf(),
            },
            identity_db,
        })
    }

    pub(crate) fn handles(&self) -> &ResourceHandles {
        &self.handles
    }

    /// Identity store matching the configured persistence
    pub(crate) fn identity_store(&self) -> IdentityStore {
        match &self.identity_db {
            Some(db) => IdentityStore::persistent(db.clone()),
            None => IdentityStore::memory(),
        }
    }
}

impl Drop for ResourceScope {
    fn drop(&mut self) {
        if let Some(db) = self.identity_db.take() {
            if let Err(e) = db.flush() {
                tracing::warn!("Failed to flush identity store on release: {}", e);
            }
        }
        tracing::debug!(
            storage = %self.handles.storage_dir.display(),
            cache = %self.handles.cache_dir.display(),
            "Released node resources"
        );
    }
}

fn create_dir(path: &Path) -> Result<(), NodeError> {
    std::fs::create_dir_all(path)
        .map_err(|e| NodeError::Storage(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_creates_directories() {
        let dir = tempdir().unwrap();
        let storage = dir.path().join("a/storage");
        let cache = dir.path().join("b/cache");

        let scope =
            ResourceScope::acquire(&storage, &cache, IdentityPersistence::Persistent).unwrap();

        assert!(storage.is_dir());
        assert!(cache.is_dir());
        assert!(storage.join(IDENTITY_DIR).exists());
        assert_eq!(scope.handles().cache_dir, cache);
    }

    #[test]
    fn test_ephemeral_scope_writes_no_identity() {
        let dir = tempdir().unwrap();
        let scope = ResourceScope::acquire(
            &dir.path().join("s"),
            &dir.path().join("c"),
            IdentityPersistence::Ephemeral,
        )
        .unwrap();

        assert!(matches!(scope.identity_store(), IdentityStore::Memory));
        assert!(!dir.path().join("s").join(IDENTITY_DIR).exists());
    }

    #[test]
    fn test_drop_releases_identity_db() {
        let dir = tempdir().unwrap();
        let storage = dir.path().join("s");
        let cache = dir.path().join("c");

        let first =
            ResourceScope::acquire(&storage, &cache, IdentityPersistence::Persistent).unwrap();
        drop(first);

        // sled holds an exclusive lock; reopening only works after release
        assert!(
            ResourceScope::acquire(&storage, &cache, IdentityPersistence::Persistent).is_ok()
        );
    }

    #[test]
    fn test_storage_path_that_is_a_file_fails() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();

        let result =
            ResourceScope::acquire(&file, &dir.path().join("c"), IdentityPersistence::Persistent);
        assert!(matches!(result, Err(NodeError::Storage(_))));
    }
}
