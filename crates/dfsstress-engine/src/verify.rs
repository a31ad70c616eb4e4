use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use dfsstress_core::checksum::crc32;
use tracing::{debug, trace};

use crate::config::StressConfig;
use crate::error::StressError;
use crate::fileset::{ExpectedFile, FileSet};
use crate::observers::{Observer, ObserverSet};

/// Whether a pair is confirmed by the file appearing or disappearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// File must exist with a matching checksum.
    Presence,
    /// File must be gone.
    Absence,
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyMode::Presence => write!(f, "presence"),
            VerifyMode::Absence => write!(f, "absence"),
        }
    }
}

/// One (observer, origin, sequence) cell of the convergence matrix.
///
/// Ordering puts the observer outermost, so an ordered scan visits pairs
/// in the same sweep order the polling loop uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PairKey {
    pub observer: usize,
    pub origin: usize,
    pub seq: u32,
}

/// Outcome of a completed verification.
#[derive(Debug, Clone, Copy)]
pub struct VerifySummary {
    /// Pairs that had to be confirmed.
    pub target: usize,
    /// Full scan passes performed.
    pub passes: u64,
}

/// Polls the observer × expected-file matrix until every pair converges.
///
/// A pair is every (observer, file) combination where the observer is not
/// the file's origin: an origin never needs to observe its own write. The
/// verifier keeps the outstanding pairs in an explicit pending set and
/// removes each exactly once when its confirmation condition is observed,
/// so a pair can never be counted twice no matter how many passes run.
///
/// Without a configured deadline the loop has no upper bound: if the
/// system under test never converges, verification spins forever. That is
/// a liveness property, not a safety one; a hang here means the system
/// under test is broken.
pub struct ConvergenceVerifier<'a> {
    observers: &'a ObserverSet,
    poll_interval: Duration,
    deadline: Option<Duration>,
}

impl<'a> ConvergenceVerifier<'a> {
    pub fn new(observers: &'a ObserverSet, config: &StressConfig) -> Self {
        ConvergenceVerifier {
            observers,
            poll_interval: config.poll_interval,
            deadline: config.phase_deadline,
        }
    }

    /// Seed the pending matrix for a file set: every pair except a file at
    /// its own origin. The set's size is the convergence target, fixed
    /// before polling begins.
    pub fn pending_pairs(&self, files: &FileSet) -> BTreeSet<PairKey> {
        let mut pending = BTreeSet::new();
        for observer in 0..self.observers.len() {
            for file in files.files() {
                if file.origin == observer {
                    continue;
                }
                pending.insert(PairKey {
                    observer,
                    origin: file.origin,
                    seq: file.seq,
                });
            }
        }
        pending
    }

    /// Block until every pending pair is confirmed, or the configured
    /// deadline lapses.
    pub async fn verify(
        &self,
        files: &FileSet,
        mode: VerifyMode,
    ) -> Result<VerifySummary, StressError> {
        let mut pending = self.pending_pairs(files);
        let target = pending.len();
        let started = Instant::now();
        let mut passes = 0u64;

        while !pending.is_empty() {
            let confirmed = self.poll_once(files, mode, &mut pending).await?;
            passes += 1;
            trace!(
                %mode,
                pass = passes,
                confirmed,
                outstanding = pending.len(),
                "scan pass complete"
            );

            if pending.is_empty() {
                break;
            }

            if let Some(deadline) = self.deadline {
                if started.elapsed() >= deadline {
                    return Err(StressError::DeadlineExceeded {
                        mode,
                        outstanding: pending.len(),
                        target,
                        waited: started.elapsed(),
                    });
                }
            }

            if self.poll_interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Ok(VerifySummary { target, passes })
    }

    /// One full scan over the still-pending pairs, removing every pair
    /// confirmed this pass. Returns how many were confirmed.
    ///
    /// A removed pair is never revisited, so each (observer, origin,
    /// sequence) triple counts toward the target exactly once across an
    /// arbitrary number of passes.
    pub async fn poll_once(
        &self,
        files: &FileSet,
        mode: VerifyMode,
        pending: &mut BTreeSet<PairKey>,
    ) -> Result<usize, StressError> {
        let mut confirmed = 0;

        for (observer_idx, observer) in self.observers.all().iter().enumerate() {
            for file in files.files() {
                if file.origin == observer_idx {
                    continue;
                }

                let key = PairKey {
                    observer: observer_idx,
                    origin: file.origin,
                    seq: file.seq,
                };
                if !pending.contains(&key) {
                    continue;
                }

                if self.check_pair(observer, file, mode).await? {
                    pending.remove(&key);
                    confirmed += 1;
                }
            }
        }

        Ok(confirmed)
    }

    /// Evaluate one pair's confirmation condition.
    async fn check_pair(
        &self,
        observer: &Observer,
        file: &ExpectedFile,
        mode: VerifyMode,
    ) -> Result<bool, StressError> {
        match mode {
            VerifyMode::Absence => Ok(!observer.mount.exists(&file.filename).await?),
            VerifyMode::Presence => match observer.mount.read(&file.filename).await {
                Ok(content) => {
                    let actual = crc32(&content);
                    if actual == file.checksum {
                        Ok(true)
                    } else {
                        // A torn or stale replica read mid-write. Routine
                        // transient state; re-check on the next pass.
                        debug!(
                            observer = %observer.dir,
                            file = %file.filename,
                            expected = file.checksum,
                            actual,
                            "checksum mismatch, not yet converged"
                        );
                        Ok(false)
                    }
                }
                // Not yet visible at this observer; the normal state
                // before convergence.
                Err(err) if err.is_not_found() => Ok(false),
                Err(err) => Err(err.into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use dfsstress_core::{MemoryMount, Mount};

    use super::*;
    use crate::fileset::RunId;
    use crate::observers::Observer;

    fn config() -> StressConfig {
        StressConfig {
            num_files: 5,
            ..Default::default()
        }
    }

    /// Observer set where every mount is private; nothing replicates
    /// unless a test copies bytes by hand.
    fn isolated_observers(client_dirs: &[&str]) -> (ObserverSet, Vec<Arc<MemoryMount>>) {
        let mut mounts = vec![Arc::new(MemoryMount::new())];
        let server = Observer::new("/srv", mounts[0].clone() as Arc<dyn Mount>);
        let clients = client_dirs
            .iter()
            .map(|dir| {
                let mount = Arc::new(MemoryMount::new());
                mounts.push(mount.clone());
                Observer::new(*dir, mount as Arc<dyn Mount>)
            })
            .collect();
        (ObserverSet::new(server, clients).unwrap(), mounts)
    }

    /// Observer set where all mounts share one store, so every write is
    /// instantly visible everywhere.
    fn shared_observers(client_dirs: &[&str]) -> (ObserverSet, Arc<MemoryMount>) {
        let shared = Arc::new(MemoryMount::new());
        let server = Observer::new("/srv", shared.clone() as Arc<dyn Mount>);
        let clients = client_dirs
            .iter()
            .map(|dir| Observer::new(*dir, shared.clone() as Arc<dyn Mount>))
            .collect();
        (ObserverSet::new(server, clients).unwrap(), shared)
    }

    #[tokio::test]
    async fn test_target_pair_count() {
        // 3 observers (server + 2 clients), 2 origins, 5 files each:
        // (3 - 1) x 2 x 5 = 20 pairs.
        let (observers, _mounts) = isolated_observers(&["/c1", "/c2"]);
        let files = FileSet::generate(&observers, RunId::from_micros(1), "create", 5)
            .await
            .unwrap();

        let verifier = ConvergenceVerifier::new(&observers, &config());
        let pending = verifier.pending_pairs(&files);
        assert_eq!(pending.len(), 20);

        // No pair pairs a file with its own origin.
        assert!(pending.iter().all(|key| key.observer != key.origin));
    }

    #[tokio::test]
    async fn test_instant_convergence_on_shared_store() {
        let (observers, _shared) = shared_observers(&["/c1", "/c2"]);
        let files = FileSet::generate(&observers, RunId::from_micros(2), "create", 5)
            .await
            .unwrap();

        let verifier = ConvergenceVerifier::new(&observers, &config());
        let summary = verifier.verify(&files, VerifyMode::Presence).await.unwrap();
        assert_eq!(summary.target, 20);
        assert_eq!(summary.passes, 1);
    }

    #[tokio::test]
    async fn test_exactly_once_confirmation() {
        let (observers, mounts) = isolated_observers(&["/c1"]);
        let files = FileSet::generate(&observers, RunId::from_micros(3), "create", 1)
            .await
            .unwrap();
        let file = &files.files()[0];

        let verifier = ConvergenceVerifier::new(&observers, &config());
        let mut pending = verifier.pending_pairs(&files);
        assert_eq!(pending.len(), 1);

        // Nothing replicated yet: no confirmations, nothing lost.
        let confirmed = verifier
            .poll_once(&files, VerifyMode::Presence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 0);
        assert_eq!(pending.len(), 1);

        // Replicate to the server, then poll twice: the pair confirms on
        // the first pass and is never recounted on the second.
        let content = mounts[1].read(&file.filename).await.unwrap();
        mounts[0].write(&file.filename, &content).await.unwrap();

        let confirmed = verifier
            .poll_once(&files, VerifyMode::Presence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 1);
        assert!(pending.is_empty());

        let confirmed = verifier
            .poll_once(&files, VerifyMode::Presence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 0);
    }

    #[tokio::test]
    async fn test_torn_read_never_confirms() {
        let (observers, mounts) = isolated_observers(&["/c1"]);
        let files = FileSet::generate(&observers, RunId::from_micros(4), "create", 1)
            .await
            .unwrap();
        let file = &files.files()[0];

        let verifier = ConvergenceVerifier::new(&observers, &config());
        let mut pending = verifier.pending_pairs(&files);

        // The server holds a truncated copy, as if read mid-write.
        let full = mounts[1].read(&file.filename).await.unwrap();
        mounts[0]
            .write(&file.filename, &full[..full.len() / 2])
            .await
            .unwrap();

        let confirmed = verifier
            .poll_once(&files, VerifyMode::Presence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 0, "torn content must not confirm");

        // The write completes; the next pass confirms.
        mounts[0].write(&file.filename, &full).await.unwrap();
        let confirmed = verifier
            .poll_once(&files, VerifyMode::Presence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 1);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_stale_content_never_confirms() {
        let (observers, mounts) = isolated_observers(&["/c1"]);
        let run_id = RunId::from_micros(5);

        // The server still holds the create-phase copy while we verify
        // the sync-phase content.
        let created = FileSet::generate(&observers, run_id, "create", 1).await.unwrap();
        let old = mounts[1].read(&created.files()[0].filename).await.unwrap();
        mounts[0]
            .write(&created.files()[0].filename, &old)
            .await
            .unwrap();

        let synced = FileSet::generate(&observers, run_id, "sync", 1).await.unwrap();
        let verifier = ConvergenceVerifier::new(&observers, &config());
        let mut pending = verifier.pending_pairs(&synced);

        let confirmed = verifier
            .poll_once(&synced, VerifyMode::Presence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 0, "stale phase content must not confirm");
    }

    #[tokio::test]
    async fn test_absence_mode() {
        let (observers, mounts) = isolated_observers(&["/c1"]);
        let files = FileSet::generate(&observers, RunId::from_micros(6), "create", 2)
            .await
            .unwrap();

        let verifier = ConvergenceVerifier::new(&observers, &config());
        let mut pending = verifier.pending_pairs(&files);
        assert_eq!(pending.len(), 2);

        // The server never saw the files, so absence confirms immediately
        // there even while the origin still holds them.
        let confirmed = verifier
            .poll_once(&files, VerifyMode::Absence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 2);
        assert!(pending.is_empty());

        // Origin copies are irrelevant to the matrix: still present.
        assert_eq!(mounts[1].len(), 2);
    }

    #[tokio::test]
    async fn test_absence_waits_for_deletion_to_propagate() {
        let (observers, mounts) = isolated_observers(&["/c1"]);
        let files = FileSet::generate(&observers, RunId::from_micros(7), "create", 1)
            .await
            .unwrap();
        let file = &files.files()[0];

        // Replicate to the server first.
        let content = mounts[1].read(&file.filename).await.unwrap();
        mounts[0].write(&file.filename, &content).await.unwrap();

        let verifier = ConvergenceVerifier::new(&observers, &config());
        let mut pending = verifier.pending_pairs(&files);

        let confirmed = verifier
            .poll_once(&files, VerifyMode::Absence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 0, "replica still visible, deletion has not propagated");

        mounts[0].remove(&file.filename).await.unwrap();
        let confirmed = verifier
            .poll_once(&files, VerifyMode::Absence, &mut pending)
            .await
            .unwrap();
        assert_eq!(confirmed, 1);
    }

    #[tokio::test]
    async fn test_deadline_escalates() {
        let (observers, _mounts) = isolated_observers(&["/c1"]);
        let files = FileSet::generate(&observers, RunId::from_micros(8), "create", 3)
            .await
            .unwrap();

        let config = StressConfig {
            num_files: 3,
            phase_deadline: Some(Duration::from_millis(1)),
            ..Default::default()
        };
        let verifier = ConvergenceVerifier::new(&observers, &config);

        // Nothing ever replicates to the server, so the deadline lapses.
        let err = verifier
            .verify(&files, VerifyMode::Presence)
            .await
            .unwrap_err();
        match err {
            StressError::DeadlineExceeded {
                mode,
                outstanding,
                target,
                ..
            } => {
                assert_eq!(mode, VerifyMode::Presence);
                assert_eq!(target, 3);
                assert_eq!(outstanding, 3);
            }
            other => panic!("expected DeadlineExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_counts_passes_over_late_arrivals() {
        let (observers, mounts) = isolated_observers(&["/c1"]);
        let files = FileSet::generate(&observers, RunId::from_micros(9), "create", 1)
            .await
            .unwrap();
        let file = files.files()[0].clone();

        // A slow replicator lands the file on the server shortly after
        // verification starts.
        let content = mounts[1].read(&file.filename).await.unwrap();
        let server = mounts[0].clone();
        let replicator = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            server.write(&file.filename, &content).await.unwrap();
        });

        let config = StressConfig {
            num_files: 1,
            poll_interval: Duration::from_millis(5),
            phase_deadline: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        let verifier = ConvergenceVerifier::new(&observers, &config);
        let summary = verifier.verify(&files, VerifyMode::Presence).await.unwrap();

        assert_eq!(summary.target, 1);
        assert!(summary.passes > 1, "first pass cannot have seen the file");
        replicator.await.unwrap();
    }
}
