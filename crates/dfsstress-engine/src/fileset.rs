use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use dfsstress_core::checksum::crc32;

use crate::error::StressError;
use crate::observers::ObserverSet;

/// Run-scoping token embedded in every generated filename.
///
/// Derived from the wall clock at microsecond resolution, so repeated runs
/// and concurrent invocations against the same mounts never collide even
/// while an earlier run's files are still propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RunId(u64);

impl RunId {
    /// Derive a fresh identifier from the wall clock.
    ///
    /// Clamped strictly past the previous identifier so two cycles
    /// starting within the same microsecond stay distinct.
    pub fn derive() -> Self {
        static LAST: AtomicU64 = AtomicU64::new(0);

        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        let mut value = micros;
        let _ = LAST.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            value = micros.max(last.wrapping_add(1));
            Some(value)
        });
        RunId(value)
    }

    /// Build an identifier from a known value (tests, replayed runs).
    pub fn from_micros(micros: u64) -> Self {
        RunId(micros)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One file the generator wrote, and the digest its replicas must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedFile {
    /// Observer index of the originating client.
    pub origin: usize,
    /// Sequence number within the origin's set.
    pub seq: u32,
    /// Name the file carries on every mount.
    pub filename: String,
    /// CRC-32 of the exact bytes written this phase.
    pub checksum: u32,
}

/// The expected state for one phase: every client origin's generated files.
///
/// Immutable once generated; one verification pass consumes it by
/// reference and it is discarded when the phase's target is reached.
pub struct FileSet {
    files: Vec<ExpectedFile>,
    per_origin: usize,
}

impl FileSet {
    /// Generate `num_files` files per client and write each through its
    /// origin's mount.
    ///
    /// Filenames are a pure function of (run id, origin tag, sequence), so
    /// the same logical file is created, modified, and deleted across the
    /// phases of one run; only the content (and its checksum) carries the
    /// phase tag. The origin tag is the CRC-32 of the origin directory's
    /// path string. A local write failure is fatal: it means the harness
    /// environment is broken, not the system under test.
    pub async fn generate(
        observers: &ObserverSet,
        run_id: RunId,
        tag: &str,
        num_files: usize,
    ) -> Result<FileSet, StressError> {
        let mut files = Vec::with_capacity(observers.client_count() * num_files);

        for origin in observers.origins() {
            let observer = observers.get(origin);
            let origin_tag = crc32(observer.dir.as_bytes());

            for seq in 0..num_files as u32 {
                let filename = format!("dfsstress-{}-{}-{}.txt", run_id, origin_tag, seq);
                let content =
                    format!("originally from {}, file {}, tag {}\n", observer.dir, seq, tag)
                        .into_bytes();
                let checksum = crc32(&content);

                observer.mount.write(&filename, &content).await?;

                files.push(ExpectedFile {
                    origin,
                    seq,
                    filename,
                    checksum,
                });
            }
        }

        Ok(FileSet { files, per_origin: num_files })
    }

    /// All entries, ordered by origin then sequence.
    pub fn files(&self) -> &[ExpectedFile] {
        &self.files
    }

    /// Total number of generated files across all origins.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files generated per origin.
    pub fn per_origin(&self) -> usize {
        self.per_origin
    }
}
