//! Per-unit recurrence: one process per `(unit, activity)` pair raising a
//! maintenance request every interval.

use dm_core::{ActivityId, UnitId};
use dm_kernel::{Cx, KernelError, KernelResult, Process, Wake, Yield};

use crate::request::raise;
use crate::{DepotError, DepotState, RecurrenceModel};

/// Sleeps until the unit's first due date (derived from its age), raises a
/// request, waits for it to complete, then sleeps one interval and repeats.
pub(crate) struct Recurrence {
    unit:     UnitId,
    activity: ActivityId,
}

impl Recurrence {
    pub(crate) fn new(unit: UnitId, activity: ActivityId) -> Self {
        Self { unit, activity }
    }

    /// `interval − (age mod interval)` calendar days, in ticks.
    fn first_delay(&self, state: &DepotState) -> u64 {
        let interval = state.activity(self.activity).interval_days;
        let age = state.unit(self.unit).age_days;
        state.calendar.ticks_for_days(interval - age % interval)
    }

    fn next_delay(&self, state: &mut DepotState) -> u64 {
        let activity = &state.activities[self.activity.index()];
        match state.recurrence {
            RecurrenceModel::Fixed => activity.interval_ticks,
            RecurrenceModel::Exponential => {
                let days = state.units[self.unit.index()].rng.exponential(activity.interval_days);
                state.calendar.ticks_for_days(days)
            }
        }
    }
}

impl Process<DepotState> for Recurrence {
    fn label(&self) -> &str {
        "recurrence"
    }

    fn resume(&mut self, cx: &mut Cx<'_, DepotState>, wake: Wake) -> KernelResult<Yield> {
        match wake.unhandled(cx.pid())? {
            Wake::Start => Ok(Yield::after(self.first_delay(cx.state))),
            Wake::Timeout => {
                let request = raise(cx, self.unit, self.activity)?;
                Ok(Yield::Join(request))
            }
            Wake::Joined(_) => Ok(Yield::after(self.next_delay(cx.state))),
            other => Err(KernelError::process(cx.pid(), DepotError::Invariant {
                unit:     self.unit,
                activity: cx.state.activity(self.activity).name.clone(),
                tick:     cx.now(),
                detail:   format!("recurrence woken by {other:?}"),
            })),
        }
    }
}
