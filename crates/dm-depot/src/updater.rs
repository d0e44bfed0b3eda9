//! The timetable updater: publishes demand-side values once per tick.

use dm_kernel::{Cx, KernelResult, Process, Wake, Yield};
use tracing::warn;

use crate::{DepotState, Published, RunWarning};

/// Publishes the tick's demand, injection flag and availability.  Stops for
/// good (raising `CapacityExhausted`) once either availability figure goes
/// negative.
pub(crate) struct TimetableUpdater;

impl Process<DepotState> for TimetableUpdater {
    fn label(&self) -> &str {
        "timetable updater"
    }

    fn resume(&mut self, cx: &mut Cx<'_, DepotState>, wake: Wake) -> KernelResult<Yield> {
        wake.unhandled(cx.pid())?;
        let now = cx.now();
        let state = &mut *cx.state;
        let fleet = state.fleet_size as i64;
        let demand = state.timetable.demand_at(now);
        let published = Published {
            demand,
            available_to_maintain: fleet - demand as i64,
            injection:             state.injection.is_blackout(now),
            trains_available:      fleet - state.occupancy as i64,
        };
        state.published = published;

        if published.available_to_maintain < 0 || published.trains_available < 0 {
            warn!(
                tick = %now,
                available_to_maintain = published.available_to_maintain,
                trains_available = published.trains_available,
                "capacity exhausted; timetable updater halted"
            );
            state.warnings.push(RunWarning::CapacityExhausted {
                tick:                  now,
                available_to_maintain: published.available_to_maintain,
                trains_available:      published.trains_available,
            });
            return Ok(Yield::Done);
        }
        Ok(Yield::after(1))
    }
}
