//! Maintenance request processes.
//!
//! Raising a request spawns three cooperating processes:
//!
//! ```text
//! Lookahead            every tick: max_future_capacity = fleet − max demand over
//!                      [now, now + duration); stops once admitted
//! ToleranceCountdown   at the deadline: tolerance_exceeded = true (one way)
//! MaintenanceRequest   AwaitingAdmission → Admitted → ResourceQueued → InService → Complete
//! ```
//!
//! They are spawned in that order, so at every tick the lookahead and the
//! countdown have run before the request re-evaluates admission.
//!
//! Admission, evaluated every tick:
//!
//! ```text
//! (!injection && occupancy < max_future_capacity && occupancy < available_capacity
//!   && !unit.in_maintenance) || tolerance_exceeded
//! ```

use dm_core::{ActivityId, ProcessId, Tick, UnitId};
use dm_kernel::{Cx, KernelError, KernelResult, Process, Ticket, Wake, Yield};
use tracing::debug;

use crate::{CompletionRecord, DepotError, DepotState, Phase, RequestId, Road, Seizure};

type DepotCx<'a> = Cx<'a, DepotState>;

/// Open a request for `unit` / `activity` and spawn its processes.  Returns
/// the pid of the `MaintenanceRequest`, which terminates on completion.
pub(crate) fn raise(cx: &mut DepotCx<'_>, unit: UnitId, activity: ActivityId) -> KernelResult<ProcessId> {
    let now = cx.now();
    let (duration, tolerance) = {
        let a = cx.state.activity(activity);
        (a.duration_ticks, a.tolerance_ticks)
    };
    let capacity = cx.state.timetable.max_future_capacity(now, duration);
    let id = cx.state.registry.open(unit, activity, now, now + tolerance, capacity);
    cx.state.live_requests += 1;
    cx.state.requests_raised += 1;

    cx.spawn(Lookahead { request: id, duration })?;
    let countdown = cx.spawn(ToleranceCountdown { request: id, tolerance })?;
    if let Some(req) = cx.state.registry.get_mut(id) {
        req.countdown = Some(countdown);
        req.phase = Phase::LookaheadEvaluating;
    }
    let pid = cx.spawn(MaintenanceRequest::new(id, unit, activity))?;
    if let Some(req) = cx.state.registry.get_mut(id) {
        req.process = Some(pid);
    }
    debug!(request = %id, %unit, activity = %cx.state.activity(activity).name, %now, "maintenance requested");
    Ok(pid)
}

// ── Lookahead ─────────────────────────────────────────────────────────────────

struct Lookahead {
    request:  RequestId,
    duration: u64,
}

impl Process<DepotState> for Lookahead {
    fn label(&self) -> &str {
        "lookahead"
    }

    fn resume(&mut self, cx: &mut DepotCx<'_>, wake: Wake) -> KernelResult<Yield> {
        wake.unhandled(cx.pid())?;
        let capacity = cx.state.timetable.max_future_capacity(cx.now(), self.duration);
        match cx.state.registry.get_mut(self.request) {
            Some(req) if req.phase < Phase::Admitted => {
                req.max_future_capacity = capacity;
                Ok(Yield::after(1))
            }
            _ => Ok(Yield::Done),
        }
    }
}

// ── ToleranceCountdown ────────────────────────────────────────────────────────

struct ToleranceCountdown {
    request:   RequestId,
    tolerance: u64,
}

impl Process<DepotState> for ToleranceCountdown {
    fn label(&self) -> &str {
        "tolerance"
    }

    fn resume(&mut self, cx: &mut DepotCx<'_>, wake: Wake) -> KernelResult<Yield> {
        // Cancelled on completion: the unhandled interrupt ends the countdown.
        let wake = wake.unhandled(cx.pid())?;
        if wake == Wake::Start && self.tolerance > 0 {
            return Ok(Yield::after(self.tolerance));
        }
        let now = cx.now();
        if let Some(req) = cx.state.registry.get_mut(self.request) {
            req.tolerance_exceeded = true;
            debug!(request = %self.request, unit = %req.unit, %now, "tolerance exceeded");
        }
        Ok(Yield::Done)
    }
}

// ── MaintenanceRequest ────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    Admission,
    RoadQueued(Ticket),
    Blackout,
    InService,
    Finished,
}

/// The admission state machine for one request.
struct MaintenanceRequest {
    request:  RequestId,
    unit:     UnitId,
    activity: ActivityId,
    step:     Step,
    /// Set between admission and completion; undone in `on_exit` otherwise.
    admitted: bool,
    road:     Option<(Ticket, Road)>,
    staffed:  u32,
    started:  Option<(Tick, bool)>,
}

impl MaintenanceRequest {
    fn new(request: RequestId, unit: UnitId, activity: ActivityId) -> Self {
        Self {
            request,
            unit,
            activity,
            step: Step::Admission,
            admitted: false,
            road: None,
            staffed: 0,
            started: None,
        }
    }

    fn invariant(&self, cx: &DepotCx<'_>, detail: impl Into<String>) -> KernelError {
        KernelError::process(cx.pid(), DepotError::Invariant {
            unit:     self.unit,
            activity: cx.state.activity(self.activity).name.clone(),
            tick:     cx.now(),
            detail:   detail.into(),
        })
    }

    fn set_phase(&self, cx: &mut DepotCx<'_>, phase: Phase) {
        if let Some(req) = cx.state.registry.get_mut(self.request) {
            req.phase = phase;
        }
    }

    fn try_admit(&mut self, cx: &mut DepotCx<'_>) -> KernelResult<Yield> {
        let now = cx.now();
        let pid = cx.pid();
        let state = &mut *cx.state;
        let Some(req) = state.registry.get(self.request) else {
            return Err(self.invariant(cx, "request left the registry before admission"));
        };

        let injection = state.injection.is_blackout(now);
        let occupancy = state.occupancy as i64;
        let available = state.timetable.available_capacity(now);
        let unit_busy = state.units[self.unit.index()].in_maintenance;
        let admit = (!injection
            && occupancy < req.max_future_capacity
            && occupancy < available
            && !unit_busy)
            || req.tolerance_exceeded;
        if !admit {
            return Ok(Yield::after(1));
        }

        let fleet = state.fleet_size as i64;
        let seizure = Seizure {
            at:                    now,
            occupancy:             state.occupancy,
            timetable_requirement: (fleet - req.max_future_capacity).max(0) as u32,
            remaining_slack:       req.deadline.signed_diff(now),
        };
        let overridden = req.tolerance_exceeded;
        if let Some(req) = state.registry.get_mut(self.request) {
            req.seizure = Some(seizure);
            req.phase = Phase::Admitted;
        }
        state.occupancy += 1;
        state.units[self.unit.index()].in_maintenance = true;
        state.live_requests = state.live_requests.saturating_sub(1);
        self.admitted = true;
        debug!(
            request = %self.request, unit = %self.unit, %now,
            occupancy = state.occupancy, overridden, "admitted"
        );

        let eligible = state.activities[self.activity.index()].eligible.clone();
        let ticket = state.roads.get(cx.sched, pid, move |r: &Road| eligible.contains(&r.id))?;
        self.step = Step::RoadQueued(ticket);
        self.set_phase(cx, Phase::ResourceQueued);
        Ok(Yield::Wait)
    }

    fn on_road(&mut self, cx: &mut DepotCx<'_>, ticket: Ticket) -> KernelResult<Yield> {
        let now = cx.now();
        let road = cx.state.roads.take(ticket, now)?;
        debug!(request = %self.request, unit = %self.unit, road = %road.name, %now, "road seized");
        self.road = Some((ticket, road));

        if cx.state.injection.is_blackout(now) {
            // Maintenance may not start while units are being injected.
            let clear = cx.state.injection.next_clear(now);
            self.step = Step::Blackout;
            return Ok(Yield::after(clear - now));
        }
        self.start_service(cx)
    }

    fn start_service(&mut self, cx: &mut DepotCx<'_>) -> KernelResult<Yield> {
        let now = cx.now();
        let (staff, duration) = {
            let a = cx.state.activity(self.activity);
            (a.staff, a.duration_ticks)
        };
        cx.state.staff.reserve(staff);
        self.staffed = staff;
        let exceeded = cx
            .state
            .registry
            .get(self.request)
            .is_some_and(|r| r.tolerance_exceeded);
        self.started = Some((now, exceeded));
        self.step = Step::InService;
        self.set_phase(cx, Phase::InService);
        Ok(Yield::after(duration))
    }

    fn complete(&mut self, cx: &mut DepotCx<'_>) -> KernelResult<Yield> {
        let now = cx.now();
        let Some((ticket, road)) = self.road.take() else {
            return Err(self.invariant(cx, "completing without a road"));
        };
        let Some((start, exceeded)) = self.started else {
            return Err(self.invariant(cx, "completing without a start time"));
        };
        let road_name = road.name.clone();
        cx.state.roads.give_back(cx.sched, ticket, road)?;

        if !cx.state.staff.release(self.staffed) {
            return Err(self.invariant(cx, format!("releasing {} staff not reserved", self.staffed)));
        }
        self.staffed = 0;
        self.release_unit(cx)?;

        let Some(req) = cx.state.registry.close(self.request) else {
            return Err(self.invariant(cx, "completed request missing from the registry"));
        };
        let Some(seizure) = req.seizure else {
            return Err(self.invariant(cx, "completed request was never admitted"));
        };

        let state = &mut *cx.state;
        let activity = &state.activities[self.activity.index()];
        let units_maintained = activity.applicability.units_maintained();
        state.units[self.unit.index()].maintained += units_maintained as u64;
        let record = CompletionRecord {
            unit:                  self.unit,
            activity:              activity.name.clone(),
            requested_at:          req.requested_at,
            deadline:              req.deadline,
            start,
            start_weekday:         state.calendar.weekday(start),
            start_hour:            state.calendar.time_of_day_hours(start),
            end:                   now,
            end_weekday:           state.calendar.weekday(now),
            end_hour:              state.calendar.time_of_day_hours(now),
            timetable_requirement: seizure.timetable_requirement,
            occupancy_at_seizure:  seizure.occupancy,
            tolerance_exceeded:    exceeded,
            road:                  road_name,
            seized_at:             seizure.at,
            remaining_slack:       seizure.remaining_slack,
            remaining_slack_days:  state.calendar.days_for_ticks(seizure.remaining_slack),
            units_maintained,
        };
        debug!(request = %self.request, unit = %self.unit, %now, "maintenance complete");
        state.completions.push(record);

        if let Some(countdown) = req.countdown.filter(|p| cx.sched.is_alive(*p)) {
            cx.sched.cancel(countdown)?;
        }
        self.step = Step::Finished;
        Ok(Yield::Done)
    }

    /// Undo the admission bookkeeping: the unit leaves the depot.
    fn release_unit(&mut self, cx: &mut DepotCx<'_>) -> KernelResult<()> {
        if !self.admitted {
            return Ok(());
        }
        let Some(occupancy) = cx.state.occupancy.checked_sub(1) else {
            return Err(self.invariant(cx, "occupancy would go negative"));
        };
        cx.state.occupancy = occupancy;
        cx.state.units[self.unit.index()].in_maintenance = false;
        self.admitted = false;
        Ok(())
    }
}

impl Process<DepotState> for MaintenanceRequest {
    fn label(&self) -> &str {
        "maintenance request"
    }

    fn resume(&mut self, cx: &mut DepotCx<'_>, wake: Wake) -> KernelResult<Yield> {
        let wake = wake.unhandled(cx.pid())?;
        match (self.step, wake) {
            (Step::Admission, Wake::Start) => {
                self.set_phase(cx, Phase::AwaitingAdmission);
                self.try_admit(cx)
            }
            (Step::Admission, Wake::Timeout) => self.try_admit(cx),
            (Step::RoadQueued(t), Wake::Granted(g)) if t == g => self.on_road(cx, t),
            (Step::Blackout, Wake::Timeout) => self.start_service(cx),
            (Step::InService, Wake::Timeout) => self.complete(cx),
            (step, wake) => Err(self.invariant(cx, format!("unexpected {wake:?} in {step:?}"))),
        }
    }

    fn on_exit(&mut self, cx: &mut DepotCx<'_>) -> KernelResult<()> {
        if self.step == Step::Finished {
            return Ok(());
        }
        if let Step::RoadQueued(ticket) = self.step {
            cx.state.roads.cancel(cx.sched, ticket)?;
        }
        if let Some((ticket, road)) = self.road.take() {
            cx.state.roads.give_back(cx.sched, ticket, road)?;
        }
        if self.staffed > 0 {
            if !cx.state.staff.release(self.staffed) {
                return Err(self.invariant(cx, format!("releasing {} staff not reserved", self.staffed)));
            }
            self.staffed = 0;
        }
        self.release_unit(cx)?;
        if let Some(req) = cx.state.registry.close(self.request) {
            if req.phase < Phase::Admitted {
                cx.state.live_requests = cx.state.live_requests.saturating_sub(1);
            }
            if let Some(countdown) = req.countdown.filter(|p| cx.sched.is_alive(*p)) {
                cx.sched.cancel(countdown)?;
            }
        }
        debug!(request = %self.request, unit = %self.unit, now = %cx.now(), "request withdrawn");
        Ok(())
    }
}
