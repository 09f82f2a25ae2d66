//! Artifact storage for build products.
//!
//! Products are addressed by a directory-like block name derived from the
//! owning node, optionally nested under a game-scope segment and a
//! storage-root segment. Archival distinguishes agent-local placement from
//! shared placement; retrieval prefers local.

mod fs;
mod memory;

pub use fs::FsArtifactStore;
pub use memory::MemoryArtifactStore;

use crate::core::BuildProducts;
use crate::errors::{ArtifactStoreError, GraphError};

/// The result of a retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    /// The archived product list, in its original order.
    pub products: BuildProducts,
    /// True if the products were found in agent-local storage.
    pub was_local: bool,
    /// True if the products were only found after falling back to the
    /// project-agnostic (empty game scope) location.
    pub used_fallback: bool,
}

/// Durable storage of product lists.
///
/// Implementations must support concurrent archive/retrieve calls for
/// independent keys. Concurrent writes to the same key are a caller error
/// and carry no defined semantics.
pub trait ArtifactStore: Send + Sync + std::fmt::Debug {
    /// Writes the product list under the composite key.
    ///
    /// Always lands in agent-local storage; `local_only` additionally
    /// suppresses shared placement. Re-archiving identical products is safe.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactStoreError` if the store cannot be written.
    fn archive(
        &self,
        block: &str,
        products: &BuildProducts,
        local_only: bool,
        game_scope: &str,
        storage_root: &str,
    ) -> Result<(), ArtifactStoreError>;

    /// Reads the product list back, preferring agent-local storage.
    ///
    /// # Errors
    ///
    /// Returns `ArtifactStoreError::NotFound` if nothing is archived under
    /// the key. Game-scope fallback is the caller's concern; see
    /// [`retrieve_with_fallback`].
    fn retrieve(
        &self,
        block: &str,
        game_scope: &str,
        storage_root: &str,
    ) -> Result<Retrieved, ArtifactStoreError>;

    /// Returns true if something is archived under the key. With
    /// `local_only`, only agent-local storage is probed.
    fn exists(&self, block: &str, game_scope: &str, storage_root: &str, local_only: bool) -> bool;
}

/// Retrieves a node's products, retrying once with an empty game scope.
///
/// If `game_scope` is non-empty and the scoped retrieval fails, the shared
/// project-agnostic location is tried before surfacing an error. Failures
/// are wrapped with the owning node's name; they are never swallowed.
///
/// # Errors
///
/// Returns `GraphError::Artifact` tagged with `node_name` if both attempts
/// fail (or the single attempt, when the scope was already empty).
pub fn retrieve_with_fallback(
    store: &dyn ArtifactStore,
    node_name: &str,
    block: &str,
    game_scope: &str,
    storage_root: &str,
) -> Result<Retrieved, GraphError> {
    match store.retrieve(block, game_scope, storage_root) {
        Ok(retrieved) => Ok(retrieved),
        Err(scoped_err) if !game_scope.is_empty() => {
            tracing::warn!(
                node = node_name,
                block,
                game_scope,
                error = %scoped_err,
                "scoped retrieval failed, falling back to shared storage"
            );
            store
                .retrieve(block, "", storage_root)
                .map(|retrieved| Retrieved {
                    used_fallback: true,
                    ..retrieved
                })
                .map_err(|source| GraphError::Artifact {
                    node: node_name.to_string(),
                    source,
                })
        }
        Err(source) => Err(GraphError::Artifact {
            node: node_name.to_string(),
            source,
        }),
    }
}

/// Probes for an archived block, honoring the same empty-game-scope
/// fallback as retrieval.
#[must_use]
pub fn exists_with_fallback(
    store: &dyn ArtifactStore,
    block: &str,
    game_scope: &str,
    storage_root: &str,
    local_only: bool,
) -> bool {
    store.exists(block, game_scope, storage_root, local_only)
        || (!game_scope.is_empty() && store.exists(block, "", storage_root, local_only))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn products(items: &[&str]) -> BuildProducts {
        items.iter().copied().collect()
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let store = MemoryArtifactStore::new();
        let archived = products(&["out/b.bin", "out/a.bin", "out/c.bin"]);
        store.archive("cl-1-Compile", &archived, false, "", "").unwrap();

        let retrieved = store.retrieve("cl-1-Compile", "", "").unwrap();
        assert_eq!(retrieved.products, archived);
    }

    #[test]
    fn test_fallback_to_empty_scope() {
        let store = MemoryArtifactStore::new();
        store
            .archive("cl-1-Cook", &products(&["cooked/pak0"]), false, "", "")
            .unwrap();
        store.forget_local();

        // Nothing under "Foo", but the shared project-agnostic entry wins.
        let retrieved =
            retrieve_with_fallback(&store, "Cook", "cl-1-Cook", "Foo", "").unwrap();
        assert_eq!(retrieved.products, products(&["cooked/pak0"]));
        assert!(!retrieved.was_local);
        assert!(retrieved.used_fallback);
    }

    #[test]
    fn test_direct_hit_reports_no_fallback() {
        let store = MemoryArtifactStore::new();
        store
            .archive("cl-1-Cook", &products(&["cooked/pak0"]), false, "Foo", "")
            .unwrap();

        let retrieved =
            retrieve_with_fallback(&store, "Cook", "cl-1-Cook", "Foo", "").unwrap();
        assert!(!retrieved.used_fallback);
    }

    #[test]
    fn test_fallback_failure_is_tagged_with_node() {
        let store = MemoryArtifactStore::new();
        let err = retrieve_with_fallback(&store, "Cook", "cl-1-Cook", "Foo", "").unwrap_err();
        assert!(matches!(err, GraphError::Artifact { ref node, .. } if node == "Cook"));
    }

    #[test]
    fn test_empty_scope_failure_does_not_fall_back() {
        let store = MemoryArtifactStore::new();
        store
            .archive("cl-1-Cook", &products(&["cooked/pak0"]), false, "Foo", "")
            .unwrap();
        store.forget_local();

        // The empty scope has no entry and is not allowed to fall "up" into
        // a scoped one.
        let err = retrieve_with_fallback(&store, "Cook", "cl-1-Cook", "", "").unwrap_err();
        assert!(matches!(err, GraphError::Artifact { .. }));
    }

    #[test]
    fn test_exists_with_fallback() {
        let store = MemoryArtifactStore::new();
        store
            .archive("cl-1-Test", &products(&["report.xml"]), false, "", "")
            .unwrap();
        store.forget_local();

        assert!(exists_with_fallback(&store, "cl-1-Test", "Foo", "", false));
        assert!(!exists_with_fallback(&store, "cl-1-Other", "Foo", "", false));
    }
}
