use std::time::Instant;

use tracing::info;

use crate::config::StressConfig;
use crate::error::StressError;
use crate::fileset::{FileSet, RunId};
use crate::observers::ObserverSet;
use crate::report::{Phase, PhaseReport};
use crate::verify::{ConvergenceVerifier, VerifyMode};

/// Drives one full create / modify / rewrite / delete cycle.
///
/// Each phase regenerates (or deletes) the run's files, then times the
/// verification pass end-to-end. Generation and deletion happen before a
/// phase's timer starts, so the reported latency is the convergence wait
/// alone.
pub struct PhaseOrchestrator<'a> {
    observers: &'a ObserverSet,
    config: &'a StressConfig,
}

impl<'a> PhaseOrchestrator<'a> {
    pub fn new(observers: &'a ObserverSet, config: &'a StressConfig) -> Self {
        PhaseOrchestrator { observers, config }
    }

    /// Run the four phases for one run id, reporting each as it completes.
    pub async fn run_cycle(
        &self,
        run_id: RunId,
        mut on_report: impl FnMut(&PhaseReport),
    ) -> Result<Vec<PhaseReport>, StressError> {
        let verifier = ConvergenceVerifier::new(self.observers, self.config);
        let num_files = self.config.num_files;
        let mut reports = Vec::with_capacity(4);

        // Bulk creation.
        let created = FileSet::generate(self.observers, run_id, "create", num_files).await?;
        reports.push(
            self.verified_phase(Phase::Create, run_id, &verifier, &created, VerifyMode::Presence, &mut on_report)
                .await?,
        );

        // Content modification: same filenames, new fingerprints.
        let modified = FileSet::generate(self.observers, run_id, "sync", num_files).await?;
        reports.push(
            self.verified_phase(Phase::Modify, run_id, &verifier, &modified, VerifyMode::Presence, &mut on_report)
                .await?,
        );

        // Idempotent re-creation: byte-identical rewrite. Checksums are
        // unchanged, yet every pair must still be confirmed.
        let rewritten = FileSet::generate(self.observers, run_id, "sync", num_files).await?;
        reports.push(
            self.verified_phase(Phase::Rewrite, run_id, &verifier, &rewritten, VerifyMode::Presence, &mut on_report)
                .await?,
        );

        // Deletion from every origin, then absence across the matrix.
        self.delete_origin_files(&rewritten).await?;
        reports.push(
            self.verified_phase(Phase::Delete, run_id, &verifier, &rewritten, VerifyMode::Absence, &mut on_report)
                .await?,
        );

        Ok(reports)
    }

    async fn verified_phase(
        &self,
        phase: Phase,
        run_id: RunId,
        verifier: &ConvergenceVerifier<'_>,
        files: &FileSet,
        mode: VerifyMode,
        on_report: &mut impl FnMut(&PhaseReport),
    ) -> Result<PhaseReport, StressError> {
        let started = Instant::now();
        let summary = verifier.verify(files, mode).await?;
        let report = PhaseReport {
            run_id: run_id.as_u64(),
            phase,
            files: self.config.num_files,
            target_pairs: summary.target,
            passes: summary.passes,
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            phase = ?report.phase,
            target_pairs = report.target_pairs,
            passes = report.passes,
            elapsed_secs = report.elapsed_secs,
            "phase converged"
        );
        on_report(&report);
        Ok(report)
    }

    /// Remove every generated file from the mount it was written to,
    /// waiting for each to become locally visible first. Guards against
    /// racing a write that has not landed on the origin yet.
    async fn delete_origin_files(&self, files: &FileSet) -> Result<(), StressError> {
        for file in files.files() {
            let origin = self.observers.get(file.origin);
            while !origin.mount.exists(&file.filename).await? {
                if self.config.poll_interval.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
            origin.mount.remove(&file.filename).await?;
        }
        Ok(())
    }
}
