use dm_core::{MachineId, SimRng};
use dm_kernel::PreemptiveResource;

use crate::{WorkshopConfig, WorkshopResult};

/// Priority of a broken machine's repair request.
pub const REPAIR_PRIORITY: i32 = 1;
/// Priority of background work; evicted by any repair.
pub const OTHER_JOB_PRIORITY: i32 = 2;

/// Counters of one machine.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MachineStats {
    /// Ticks of completed production.
    pub uptime:     u64,
    /// Ticks from breakdown to end of repair, for finished repairs.
    pub downtime:   u64,
    pub parts:      u64,
    pub breakdowns: u64,
    pub broken:     bool,
}

pub struct WorkshopState {
    pub config:              WorkshopConfig,
    pub repairers:           PreemptiveResource,
    pub machines:            Vec<MachineStats>,
    pub other_jobs_done:     u64,
    pub other_jobs_preempted: u64,
    rngs:                    Vec<SimRng>,
}

impl WorkshopState {
    pub fn new(config: &WorkshopConfig) -> WorkshopResult<Self> {
        let mut root = SimRng::new(config.seed);
        Ok(Self {
            config:               config.clone(),
            repairers:            PreemptiveResource::new("repairers", config.repairers)?,
            machines:             vec![MachineStats::default(); config.machines as usize],
            other_jobs_done:      0,
            other_jobs_preempted: 0,
            rngs:                 (0..config.machines as u64).map(|i| root.child(i)).collect(),
        })
    }

    #[inline]
    pub fn machine(&self, id: MachineId) -> &MachineStats {
        &self.machines[id.index()]
    }

    /// Ticks until `id` next fails.
    pub(crate) fn time_to_failure(&mut self, id: MachineId) -> u64 {
        let mean = self.config.mttf;
        draw_ticks(&mut self.rngs[id.index()], mean)
    }

    /// Repair plus logistics delay for `id`.
    pub(crate) fn repair_time(&mut self, id: MachineId) -> u64 {
        let (mttr, delay) = (self.config.mttr, self.config.logistics_delay);
        let rng = &mut self.rngs[id.index()];
        let ticks = rng.exponential(mttr) + rng.exponential(delay);
        (ticks.ceil() as u64).max(1)
    }
}

fn draw_ticks(rng: &mut SimRng, mean: f64) -> u64 {
    (rng.exponential(mean).ceil() as u64).max(1)
}
