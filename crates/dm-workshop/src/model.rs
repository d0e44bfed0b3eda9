use dm_core::{MachineId, Tick};
use dm_kernel::Simulation;
use tracing::info;

use crate::machine::{Breakdown, Machine};
use crate::other::OtherJobs;
use crate::{WorkshopConfig, WorkshopReport, WorkshopResult, WorkshopState};

/// Machines, their breakdowns and the repair crew's background work.
pub struct Workshop {
    sim: Simulation<WorkshopState>,
}

impl Workshop {
    pub fn new(config: &WorkshopConfig) -> WorkshopResult<Self> {
        config.validate()?;
        let mut sim = Simulation::new(WorkshopState::new(config)?);
        for i in 0..config.machines {
            let id = MachineId(i);
            let worker = sim.spawn(Machine::new(id))?;
            sim.spawn(Breakdown::new(id, worker))?;
        }
        sim.spawn(OtherJobs::new())?;
        info!(machines = config.machines, repairers = config.repairers, "workshop built");
        Ok(Self { sim })
    }

    pub fn now(&self) -> Tick {
        self.sim.now()
    }

    pub fn state(&self) -> &WorkshopState {
        &self.sim.state
    }

    /// Run to the configured horizon and report.
    pub fn run(&mut self) -> WorkshopResult<WorkshopReport> {
        let end = Tick(self.sim.state.config.total_ticks);
        self.sim.run_until(end)?;
        let report = self.report();
        info!(
            series_availability = report.series_availability,
            preemptions = report.preemptions,
            other_jobs_done = report.other_jobs_done,
            "workshop run finished"
        );
        Ok(report)
    }

    pub fn report(&self) -> WorkshopReport {
        WorkshopReport::build(&self.sim.state, self.now().0)
    }
}
