use dm_core::MachineId;
use serde::Serialize;

use crate::WorkshopState;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MachineReport {
    pub machine:      MachineId,
    pub uptime:       u64,
    pub downtime:     u64,
    pub parts:        u64,
    pub breakdowns:   u64,
    /// `uptime / (uptime + downtime)`; 1.0 for a machine with neither.
    pub availability: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkshopReport {
    pub ticks:                u64,
    pub machines:             Vec<MachineReport>,
    /// Product of machine availabilities (machines in series).
    pub series_availability:  f64,
    pub other_jobs_done:      u64,
    pub other_jobs_preempted: u64,
    pub preemptions:          u64,
}

impl WorkshopReport {
    pub(crate) fn build(state: &WorkshopState, ticks: u64) -> Self {
        let machines: Vec<_> = state
            .machines
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let total = m.uptime + m.downtime;
                MachineReport {
                    machine:      MachineId(i as u32),
                    uptime:       m.uptime,
                    downtime:     m.downtime,
                    parts:        m.parts,
                    breakdowns:   m.breakdowns,
                    availability: if total == 0 { 1.0 } else { m.uptime as f64 / total as f64 },
                }
            })
            .collect();
        Self {
            ticks,
            series_availability:  machines.iter().map(|m| m.availability).product(),
            machines,
            other_jobs_done:      state.other_jobs_done,
            other_jobs_preempted: state.other_jobs_preempted,
            preemptions:          state.repairers.preemptions(),
        }
    }
}
