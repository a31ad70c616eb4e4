use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::MountError;
use crate::traits::Mount;

/// In-memory mount for testing.
///
/// Shared (via `Arc`) across several observers it behaves like an
/// instantly-convergent filesystem; tests stage partial replication by
/// writing torn or stale content into an observer's private instance.
pub struct MemoryMount {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryMount {
    /// Create a new empty memory mount.
    pub fn new() -> Self {
        MemoryMount {
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Number of files currently stored.
    pub fn len(&self) -> usize {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files.len()
    }

    /// True if the mount holds no files.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryMount {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Mount for MemoryMount {
    async fn read(&self, name: &str) -> Result<Vec<u8>, MountError> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        files
            .get(name)
            .cloned()
            .ok_or_else(|| MountError::NotFound(name.to_string()))
    }

    async fn write(&self, name: &str, content: &[u8]) -> Result<(), MountError> {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files.insert(name.to_string(), content.to_vec());
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, MountError> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        Ok(files.contains_key(name))
    }

    async fn remove(&self, name: &str) -> Result<(), MountError> {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| MountError::NotFound(name.to_string()))
    }
}
