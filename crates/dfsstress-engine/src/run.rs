use tracing::info;

use crate::config::{RunLimit, StressConfig};
use crate::error::StressError;
use crate::fileset::RunId;
use crate::observers::ObserverSet;
use crate::phase::PhaseOrchestrator;
use crate::report::PhaseReport;

/// Outermost control loop: repeats full phase cycles per the configured
/// run limit.
///
/// A fresh run id is derived for every cycle so filenames never collide
/// with an earlier, possibly still-propagating run. In soak mode the loop
/// only ends with the process.
pub struct RunDriver<'a> {
    observers: &'a ObserverSet,
    config: &'a StressConfig,
}

impl<'a> RunDriver<'a> {
    pub fn new(observers: &'a ObserverSet, config: &'a StressConfig) -> Self {
        RunDriver { observers, config }
    }

    /// Run cycles until the limit is reached, handing each phase report to
    /// the callback as it completes. Returns the number of cycles run.
    pub async fn run(
        &self,
        mut on_report: impl FnMut(&PhaseReport),
    ) -> Result<u64, StressError> {
        self.config.validate()?;

        let orchestrator = PhaseOrchestrator::new(self.observers, self.config);
        let mut cycles = 0u64;

        loop {
            let run_id = RunId::derive();
            info!(%run_id, cycle = cycles, "starting stress cycle");
            orchestrator.run_cycle(run_id, &mut on_report).await?;
            cycles += 1;

            match self.config.run_limit {
                RunLimit::Soak => {}
                RunLimit::Count(limit) if cycles >= limit => return Ok(cycles),
                RunLimit::Count(_) => {}
            }
        }
    }
}
