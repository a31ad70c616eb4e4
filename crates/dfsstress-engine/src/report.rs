use serde::Serialize;

/// Which stage of the stress cycle a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Bulk creation of fresh files.
    Create,
    /// Rewrite with changed content; exercises re-sync.
    Modify,
    /// Rewrite with byte-identical content; nothing real propagates.
    Rewrite,
    /// Deletion from every origin.
    Delete,
}

impl Phase {
    /// Verb used in the human-readable timing line.
    pub fn verb(self) -> &'static str {
        match self {
            Phase::Create => "create",
            Phase::Modify => "modify",
            Phase::Rewrite => "recreate but not change",
            Phase::Delete => "delete",
        }
    }
}

/// Timing result for one verified phase.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub run_id: u64,
    pub phase: Phase,
    /// Files per client mount.
    pub files: usize,
    /// (observer, file) pairs confirmed for this phase.
    pub target_pairs: usize,
    /// Full verification scans needed.
    pub passes: u64,
    /// End-to-end verification time in seconds.
    pub elapsed_secs: f64,
}

impl PhaseReport {
    /// One-line timing report for terminal output.
    pub fn summary_line(&self) -> String {
        format!(
            "Time to {} {} files: {}",
            self.phase.verb(),
            self.files,
            self.elapsed_secs
        )
    }
}
