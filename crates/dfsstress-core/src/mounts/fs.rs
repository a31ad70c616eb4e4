use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

use crate::error::MountError;
use crate::traits::Mount;

/// Local filesystem mount rooted at a directory.
pub struct FsMount {
    root: PathBuf,
}

impl FsMount {
    /// Create a mount rooted at the given path, creating the directory if
    /// it does not exist yet.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, MountError> {
        let root = root.as_ref();

        let root = if root.exists() {
            root.canonicalize()?
        } else {
            std::fs::create_dir_all(root)?;
            root.canonicalize()?
        };

        Ok(FsMount { root })
    }

    /// Directory this mount is rooted at.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a file name to an absolute path, preventing directory
    /// traversal out of the mount root.
    fn resolve(&self, name: &str) -> Result<PathBuf, MountError> {
        let trimmed = name.trim_start_matches('/');
        let rel = Path::new(trimmed);

        for component in rel.components() {
            match component {
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(MountError::PathTraversal(trimmed.to_string()));
                }
                _ => {}
            }
        }

        let full_path = self.root.join(rel);

        // Symlinked ancestors must still resolve under the root.
        let mut ancestor = full_path.as_path();
        while !ancestor.exists() {
            match ancestor.parent() {
                Some(parent) => ancestor = parent,
                None => break,
            }
        }

        let canonical_ancestor = ancestor.canonicalize()?;
        if !canonical_ancestor.starts_with(&self.root) {
            return Err(MountError::PathTraversal(trimmed.to_string()));
        }

        Ok(full_path)
    }
}

#[async_trait]
impl Mount for FsMount {
    #[instrument(skip(self), fields(mount = "fs", name = %name))]
    async fn read(&self, name: &str) -> Result<Vec<u8>, MountError> {
        let full_path = self.resolve(name)?;
        fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MountError::NotFound(name.to_string())
            } else {
                MountError::Io(e)
            }
        })
    }

    #[instrument(skip(self, content), fields(mount = "fs", name = %name, size = content.len()))]
    async fn write(&self, name: &str, content: &[u8]) -> Result<(), MountError> {
        let full_path = self.resolve(name)?;
        debug!(full_path = ?full_path, "writing file");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // One full-content write call; the origin never exposes a torn
        // version of its own file.
        fs::write(&full_path, content).await.map_err(MountError::Io)
    }

    #[instrument(skip(self), fields(mount = "fs", name = %name))]
    async fn exists(&self, name: &str) -> Result<bool, MountError> {
        let full_path = self.resolve(name)?;
        Ok(full_path.exists())
    }

    #[instrument(skip(self), fields(mount = "fs", name = %name))]
    async fn remove(&self, name: &str) -> Result<(), MountError> {
        let full_path = self.resolve(name)?;
        debug!(full_path = ?full_path, "removing file");

        fs::remove_file(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MountError::NotFound(name.to_string())
            } else {
                MountError::Io(e)
            }
        })
    }
}
