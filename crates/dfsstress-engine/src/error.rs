use std::time::Duration;

use dfsstress_core::MountError;

use crate::config::ConfigError;
use crate::verify::VerifyMode;

/// Errors that abort a stress run.
///
/// Everything here is fatal: a broken harness-side mount, a rejected
/// configuration, or a lapsed opt-in deadline. Transient replication state
/// (missing replicas, torn reads) never surfaces as an error; the polling
/// loop absorbs it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StressError {
    /// Mount access failed on the harness side.
    #[error("Mount error: {0}")]
    Mount(#[from] MountError),

    /// The run was configured inconsistently.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A configured phase deadline lapsed before convergence.
    #[error(
        "{outstanding} of {target} pairs still unconverged in {mode} mode after {waited:.1?}"
    )]
    DeadlineExceeded {
        mode: VerifyMode,
        outstanding: usize,
        target: usize,
        waited: Duration,
    },
}
