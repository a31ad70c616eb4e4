use std::time::Duration;

/// How many full stress cycles the driver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunLimit {
    /// Repeat forever; the default soak mode.
    #[default]
    Soak,
    /// Run a fixed number of cycles, then stop.
    Count(u64),
}

/// Tuning knobs for a stress run.
///
/// Defaults: a tight polling loop with no deadline, soaking until
/// interrupted.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Files generated per client mount in each phase.
    pub num_files: usize,

    /// Sleep between full verification scans and between local-visibility
    /// checks in the delete phase. Zero keeps the tight loop.
    pub poll_interval: Duration,

    /// Upper bound on a single phase's verification. None never times out;
    /// a phase that cannot converge then spins forever, which is the
    /// intended way to surface a broken system under test.
    pub phase_deadline: Option<Duration>,

    /// Outer cycle limit.
    pub run_limit: RunLimit,
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            num_files: 10,
            poll_interval: Duration::ZERO,
            phase_deadline: None,
            run_limit: RunLimit::Soak,
        }
    }
}

impl StressConfig {
    /// Check invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_files == 0 {
            return Err(ConfigError::NoFiles);
        }
        if let Some(deadline) = self.phase_deadline {
            if deadline.is_zero() {
                return Err(ConfigError::ZeroDeadline);
            }
        }
        if self.run_limit == RunLimit::Count(0) {
            return Err(ConfigError::ZeroRuns);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("number of files per client must be at least 1")]
    NoFiles,

    #[error("at least one client mount is required")]
    NoClients,

    #[error("Duplicate mount path: {0}")]
    DuplicateMount(String),

    #[error("phase deadline must be greater than zero when set")]
    ZeroDeadline,

    #[error("run count must be at least 1 when bounded")]
    ZeroRuns,
}
