/// Errors that can occur in mount operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MountError {
    /// File does not exist under the mount.
    #[error("Path not found: {0}")]
    NotFound(String),

    /// Name would escape the mount root.
    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MountError {
    /// Returns true if the error only says the file is not there.
    ///
    /// NotFound is the normal pre-convergence state for an observer and is
    /// absorbed by the polling loop; everything else aborts the run.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MountError::NotFound(_))
    }
}
