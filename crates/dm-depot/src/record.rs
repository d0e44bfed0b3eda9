//! Records emitted by the depot run: completions, per-tick snapshots and
//! run-level warnings.

use std::fmt;

use dm_core::{Tick, UnitId, Weekday};
use serde::Serialize;

/// One completed maintenance activity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub unit:                  UnitId,
    pub activity:              String,
    pub requested_at:          Tick,
    pub deadline:              Tick,
    pub start:                 Tick,
    pub start_weekday:         Weekday,
    pub start_hour:            f64,
    pub end:                   Tick,
    pub end_weekday:           Weekday,
    pub end_hour:              f64,
    /// Peak timetable demand over the activity's duration, at seizure.
    pub timetable_requirement: u32,
    pub occupancy_at_seizure:  u32,
    /// Flag as it stood when service started.
    pub tolerance_exceeded:    bool,
    pub road:                  String,
    pub seized_at:             Tick,
    /// Ticks of tolerance left at seizure (negative if overdue).
    pub remaining_slack:       i64,
    pub remaining_slack_days:  f64,
    pub units_maintained:      u32,
}

/// Whether units are currently being injected into service or received
/// back into the depot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum ShuntingStatus {
    Injection,
    Reception,
}

impl ShuntingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShuntingStatus::Injection => "INJECTION",
            ShuntingStatus::Reception => "RECEPTION",
        }
    }
}

impl fmt::Display for ShuntingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Depot state at the end of one tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepotSnapshot {
    pub tick:                  Tick,
    pub weekday:               Weekday,
    pub hour:                  f64,
    pub roads_free:            usize,
    pub staff_in_use:          u32,
    pub occupancy:             u32,
    pub timetable_requirement: u32,
    pub shunting:              ShuntingStatus,
    /// `fleet − occupancy`.
    pub trains_available:      i64,
    /// `fleet − occupancy − demand`; negative means the timetable is missed.
    pub spare_units:           i64,
    /// Requests raised but not yet admitted.
    pub live_requests:         u32,
    /// `min(demand, fleet − occupancy)`.
    pub units_in_service:      i64,
    pub peak:                  bool,
}

/// A run-level condition that halts part of the model without aborting the
/// run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum RunWarning {
    /// Computed available capacity went negative; the timetable updater
    /// stopped publishing.
    CapacityExhausted {
        tick:                  Tick,
        available_to_maintain: i64,
        trains_available:      i64,
    },
}

impl fmt::Display for RunWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunWarning::CapacityExhausted { tick, available_to_maintain, trains_available } => write!(
                f,
                "capacity exhausted at {tick}: available_to_maintain={available_to_maintain}, \
                 trains_available={trains_available}"
            ),
        }
    }
}
