//! Workshop parameters.  All durations are in ticks (one tick = one minute
//! in the defaults).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{WorkshopError, WorkshopResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    pub machines:        u32,
    /// Size of the repair crew shared by breakdowns and background work.
    pub repairers:       usize,
    /// Mean time to failure of one machine.
    pub mttf:            f64,
    /// Mean hands-on repair time.
    pub mttr:            f64,
    /// Mean logistics delay added to every repair.
    pub logistics_delay: f64,
    /// Ticks of uninterrupted work per part.
    pub part_ticks:      u64,
    /// Length of one background job.
    pub other_job_ticks: u64,
    pub total_ticks:     u64,
    pub seed:            u64,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            machines:        12,
            repairers:       2,
            mttf:            250.0 * 60.0,
            mttr:            300.0,
            logistics_delay: 120.0,
            part_ticks:      5,
            other_job_ticks: 60,
            total_ticks:     52 * 7 * 24 * 60,
            seed:            42,
        }
    }
}

impl WorkshopConfig {
    pub fn from_json(json: &str) -> WorkshopResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> WorkshopResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> WorkshopResult<()> {
        let fail = |msg: &str| Err(WorkshopError::Config(msg.to_owned()));
        if self.machines == 0 {
            return fail("machines must be > 0");
        }
        if self.repairers == 0 {
            return fail("repairers must be > 0");
        }
        if self.part_ticks == 0 || self.other_job_ticks == 0 {
            return fail("part_ticks and other_job_ticks must be > 0");
        }
        let means = [self.mttf, self.mttr, self.logistics_delay];
        if means.iter().any(|m| !(m.is_finite() && *m >= 0.0)) || self.mttf == 0.0 {
            return fail("mttf must be > 0; mttr and logistics_delay must be ≥ 0");
        }
        Ok(())
    }
}
