pub mod config;
pub mod error;
pub mod fileset;
pub mod observers;
pub mod phase;
pub mod report;
pub mod run;
pub mod verify;

pub use config::{ConfigError, RunLimit, StressConfig};
pub use error::StressError;
pub use fileset::{ExpectedFile, FileSet, RunId};
pub use observers::{Observer, ObserverSet};
pub use phase::PhaseOrchestrator;
pub use report::{Phase, PhaseReport};
pub use run::RunDriver;
pub use verify::{ConvergenceVerifier, PairKey, VerifyMode, VerifySummary};
