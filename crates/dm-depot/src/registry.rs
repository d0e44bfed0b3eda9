//! Active-request bookkeeping.
//!
//! Every open maintenance request is held in one map keyed by `RequestId`
//! and indexed by `(unit, activity)`.  Requests are inserted when raised and
//! removed when they complete or are cancelled; whatever is left at the
//! horizon is reported as outstanding.

use std::collections::BTreeMap;
use std::fmt;

use dm_core::{ActivityId, ProcessId, Tick, UnitId};

/// Identifies one maintenance request for the whole run.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Admission state machine of a request.  Variants are ordered, so
/// `phase < Phase::Admitted` means "still waiting for admission".
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Phase {
    Pending,
    LookaheadEvaluating,
    AwaitingAdmission,
    Admitted,
    ResourceQueued,
    InService,
    Complete,
}

/// Depot conditions captured at the moment a unit is admitted.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Seizure {
    pub at:                    Tick,
    /// Occupancy just before this unit entered.
    pub occupancy:             u32,
    /// Peak demand over the activity's duration, as last seen by the
    /// lookahead.
    pub timetable_requirement: u32,
    /// `deadline − at`; negative once the tolerance has run out.
    pub remaining_slack:       i64,
}

#[derive(Clone, Debug)]
pub struct Request {
    pub id:                  RequestId,
    pub unit:                UnitId,
    pub activity:            ActivityId,
    pub phase:               Phase,
    pub requested_at:        Tick,
    pub deadline:            Tick,
    /// One-way flag set by the tolerance countdown.
    pub tolerance_exceeded:  bool,
    /// `fleet − max demand over [now, now + duration)`, refreshed every tick
    /// by the lookahead until admission.
    pub max_future_capacity: i64,
    pub seizure:             Option<Seizure>,
    pub countdown:           Option<ProcessId>,
    /// The `MaintenanceRequest` process driving this request.
    pub process:             Option<ProcessId>,
}

#[derive(Default)]
pub struct Registry {
    requests: BTreeMap<RequestId, Request>,
    by_key:   BTreeMap<(UnitId, ActivityId), Vec<RequestId>>,
    next_id:  u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &mut self,
        unit:                UnitId,
        activity:            ActivityId,
        now:                 Tick,
        deadline:            Tick,
        max_future_capacity: i64,
    ) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.requests.insert(id, Request {
            id,
            unit,
            activity,
            phase: Phase::Pending,
            requested_at: now,
            deadline,
            tolerance_exceeded: false,
            max_future_capacity,
            seizure: None,
            countdown: None,
            process: None,
        });
        self.by_key.entry((unit, activity)).or_default().push(id);
        id
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.requests.get_mut(&id)
    }

    /// Remove a request.  Returns it if it was still open.
    pub fn close(&mut self, id: RequestId) -> Option<Request> {
        let req = self.requests.remove(&id)?;
        let key = (req.unit, req.activity);
        if let Some(ids) = self.by_key.get_mut(&key) {
            ids.retain(|r| *r != id);
            if ids.is_empty() {
                self.by_key.remove(&key);
            }
        }
        Some(req)
    }

    /// Open requests of `unit` for `activity`, oldest first.
    pub fn open_for(&self, unit: UnitId, activity: ActivityId) -> &[RequestId] {
        self.by_key.get(&(unit, activity)).map_or(&[], Vec::as_slice)
    }

    /// Every open request, ordered by unit, then activity, then age.
    pub fn outstanding(&self) -> impl Iterator<Item = &Request> + '_ {
        self.by_key
            .values()
            .flatten()
            .filter_map(|id| self.requests.get(id))
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
