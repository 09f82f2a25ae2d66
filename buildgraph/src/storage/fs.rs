//! Filesystem artifact store.
//!
//! Each block is a directory holding a JSON manifest that records the
//! ordered product list. Layout:
//!
//! ```text
//! <root>/[storage_root/][game_scope/]<block>/<block>.manifest.json
//! ```
//!
//! The local root stands in for the executing agent's private storage; the
//! shared root, when configured, is reachable by every agent.

use super::{ArtifactStore, Retrieved};
use crate::core::BuildProducts;
use crate::errors::ArtifactStoreError;
use crate::utils::iso_timestamp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The manifest written for each archived block.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BlockManifest {
    block: String,
    products: BuildProducts,
    created_at: String,
}

/// An artifact store rooted in one local and one optional shared directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    local_root: PathBuf,
    shared_root: Option<PathBuf>,
}

impl FsArtifactStore {
    /// Creates a store with agent-local storage only.
    #[must_use]
    pub fn local(local_root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: local_root.into(),
            shared_root: None,
        }
    }

    /// Creates a store with both local and shared roots.
    #[must_use]
    pub fn new(local_root: impl Into<PathBuf>, shared_root: impl Into<PathBuf>) -> Self {
        Self {
            local_root: local_root.into(),
            shared_root: Some(shared_root.into()),
        }
    }

    fn block_dir(base: &Path, storage_root: &str, game_scope: &str, block: &str) -> PathBuf {
        let mut dir = base.to_path_buf();
        if !storage_root.is_empty() {
            dir.push(storage_root);
        }
        if !game_scope.is_empty() {
            dir.push(game_scope);
        }
        dir.push(block);
        dir
    }

    fn manifest_path(base: &Path, storage_root: &str, game_scope: &str, block: &str) -> PathBuf {
        Self::block_dir(base, storage_root, game_scope, block)
            .join(format!("{block}.manifest.json"))
    }

    // Local storage is agent-private and never game-scoped.
    fn local_manifest(&self, storage_root: &str, block: &str) -> PathBuf {
        Self::manifest_path(&self.local_root, storage_root, "", block)
    }

    fn write_manifest(
        path: &Path,
        block: &str,
        products: &BuildProducts,
    ) -> Result<(), ArtifactStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let manifest = BlockManifest {
            block: block.to_string(),
            products: products.clone(),
            created_at: iso_timestamp(),
        };
        let json = serde_json::to_string_pretty(&manifest).map_err(|source| {
            ArtifactStoreError::Manifest {
                block: block.to_string(),
                source,
            }
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    fn read_manifest(path: &Path, block: &str) -> Result<Option<BuildProducts>, ArtifactStoreError> {
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        let manifest: BlockManifest =
            serde_json::from_str(&json).map_err(|source| ArtifactStoreError::Manifest {
                block: block.to_string(),
                source,
            })?;
        Ok(Some(manifest.products))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn archive(
        &self,
        block: &str,
        products: &BuildProducts,
        local_only: bool,
        game_scope: &str,
        storage_root: &str,
    ) -> Result<(), ArtifactStoreError> {
        Self::write_manifest(&self.local_manifest(storage_root, block), block, products)?;

        if !local_only {
            if let Some(shared_root) = &self.shared_root {
                let path = Self::manifest_path(shared_root, storage_root, game_scope, block);
                Self::write_manifest(&path, block, products)?;
                tracing::debug!(block, game_scope, "archived block to shared storage");
            }
        }
        Ok(())
    }

    fn retrieve(
        &self,
        block: &str,
        game_scope: &str,
        storage_root: &str,
    ) -> Result<Retrieved, ArtifactStoreError> {
        if let Some(products) =
            Self::read_manifest(&self.local_manifest(storage_root, block), block)?
        {
            return Ok(Retrieved {
                products,
                was_local: true,
                used_fallback: false,
            });
        }

        if let Some(shared_root) = &self.shared_root {
            let path = Self::manifest_path(shared_root, storage_root, game_scope, block);
            if let Some(products) = Self::read_manifest(&path, block)? {
                return Ok(Retrieved {
                    products,
                    was_local: false,
                    used_fallback: false,
                });
            }
        }

        Err(ArtifactStoreError::NotFound {
            block: block.to_string(),
            game_scope: game_scope.to_string(),
        })
    }

    fn exists(&self, block: &str, game_scope: &str, storage_root: &str, local_only: bool) -> bool {
        if self.local_manifest(storage_root, block).is_file() {
            return true;
        }
        if local_only {
            return false;
        }
        self.shared_root.as_ref().is_some_and(|shared_root| {
            Self::manifest_path(shared_root, storage_root, game_scope, block).is_file()
        })
    }
}
