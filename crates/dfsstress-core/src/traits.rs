use async_trait::async_trait;

use crate::error::MountError;

/// POSIX-like view of one mount point of the filesystem under test.
///
/// Only presence and full byte content are observable through this
/// boundary; whatever replication machinery sits underneath is invisible
/// to callers. Names are plain file names joined under the mount root.
#[async_trait]
pub trait Mount: Send + Sync + 'static {
    /// Read the full contents of a file.
    async fn read(&self, name: &str) -> Result<Vec<u8>, MountError>;

    /// Write full content in one call, creating or replacing the file.
    async fn write(&self, name: &str, content: &[u8]) -> Result<(), MountError>;

    /// Check whether a file exists.
    async fn exists(&self, name: &str) -> Result<bool, MountError>;

    /// Remove a file.
    async fn remove(&self, name: &str) -> Result<(), MountError>;
}
