//! In-memory artifact store, used for tests and dry-run evaluation.

use super::{ArtifactStore, Retrieved};
use crate::core::BuildProducts;
use crate::errors::ArtifactStoreError;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Address of a shared block: (storage root, game scope, block name).
type SharedKey = (String, String, String);

/// Address of a local block. Local storage belongs to a single agent and is
/// not game-scoped.
type LocalKey = (String, String);

/// An artifact store backed by two in-process tables.
///
/// The local table stands in for the executing agent's private storage; the
/// shared table for storage every agent can reach. Independent keys may be
/// archived and retrieved concurrently.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    local: RwLock<HashMap<LocalKey, BuildProducts>>,
    shared: RwLock<HashMap<SharedKey, BuildProducts>>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the agent-local table, as when a block archived by one agent is
    /// later retrieved by a different one.
    pub fn forget_local(&self) {
        self.local.write().clear();
    }

    /// Returns the number of blocks in shared storage.
    #[must_use]
    pub fn shared_len(&self) -> usize {
        self.shared.read().len()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn archive(
        &self,
        block: &str,
        products: &BuildProducts,
        local_only: bool,
        game_scope: &str,
        storage_root: &str,
    ) -> Result<(), ArtifactStoreError> {
        self.local.write().insert(
            (storage_root.to_string(), block.to_string()),
            products.clone(),
        );
        if !local_only {
            self.shared.write().insert(
                (
                    storage_root.to_string(),
                    game_scope.to_string(),
                    block.to_string(),
                ),
                products.clone(),
            );
        }
        Ok(())
    }

    fn retrieve(
        &self,
        block: &str,
        game_scope: &str,
        storage_root: &str,
    ) -> Result<Retrieved, ArtifactStoreError> {
        let local_key = (storage_root.to_string(), block.to_string());
        if let Some(products) = self.local.read().get(&local_key) {
            return Ok(Retrieved {
                products: products.clone(),
                was_local: true,
                used_fallback: false,
            });
        }

        let shared_key = (
            storage_root.to_string(),
            game_scope.to_string(),
            block.to_string(),
        );
        self.shared.read().get(&shared_key).map_or_else(
            || {
                Err(ArtifactStoreError::NotFound {
                    block: block.to_string(),
                    game_scope: game_scope.to_string(),
                })
            },
            |products| {
                Ok(Retrieved {
                    products: products.clone(),
                    was_local: false,
                    used_fallback: false,
                })
            },
        )
    }

    fn exists(&self, block: &str, game_scope: &str, storage_root: &str, local_only: bool) -> bool {
        let local_key = (storage_root.to_string(), block.to_string());
        if self.local.read().contains_key(&local_key) {
            return true;
        }
        if local_only {
            return false;
        }
        let shared_key = (
            storage_root.to_string(),
            game_scope.to_string(),
            block.to_string(),
        );
        self.shared.read().contains_key(&shared_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products(items: &[&str]) -> BuildProducts {
        items.iter().copied().collect()
    }

    #[test]
    fn test_local_preferred_over_shared() {
        let store = MemoryArtifactStore::new();
        store
            .archive("b1", &products(&["x"]), false, "", "")
            .unwrap();

        let retrieved = store.retrieve("b1", "", "").unwrap();
        assert!(retrieved.was_local);
    }

    #[test]
    fn test_local_only_suppresses_shared() {
        let store = MemoryArtifactStore::new();
        store.archive("b1", &products(&["x"]), true, "", "").unwrap();
        assert_eq!(store.shared_len(), 0);

        store.forget_local();
        assert!(store.retrieve("b1", "", "").is_err());
    }

    #[test]
    fn test_scoped_entries_are_independent() {
        let store = MemoryArtifactStore::new();
        store
            .archive("b1", &products(&["scoped"]), false, "Foo", "")
            .unwrap();
        store
            .archive("b1", &products(&["shared"]), false, "", "")
            .unwrap();
        store.forget_local();

        let scoped = store.retrieve("b1", "Foo", "").unwrap();
        assert_eq!(scoped.products, products(&["scoped"]));
        assert!(!scoped.was_local);

        let shared = store.retrieve("b1", "", "").unwrap();
        assert_eq!(shared.products, products(&["shared"]));
    }

    #[test]
    fn test_rearchive_is_idempotent() {
        let store = MemoryArtifactStore::new();
        let items = products(&["a", "b"]);
        store.archive("b1", &items, false, "", "").unwrap();
        store.archive("b1", &items, false, "", "").unwrap();

        assert_eq!(store.retrieve("b1", "", "").unwrap().products, items);
    }

    #[test]
    fn test_storage_root_segments_keys() {
        let store = MemoryArtifactStore::new();
        store
            .archive("b1", &products(&["r1"]), false, "", "roots/one")
            .unwrap();

        assert!(store.retrieve("b1", "", "roots/one").is_ok());
        assert!(store.retrieve("b1", "", "roots/two").is_err());
    }
}
