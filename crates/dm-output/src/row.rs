//! Flat row types written by every backend.

use dm_depot::{CompletionRecord, DepotSnapshot};

/// Column names of [`CompletionRow`], in write order.
pub const COMPLETION_COLUMNS: [&str; 18] = [
    "unit", "activity", "requested_at", "deadline", "start", "start_weekday", "start_hour",
    "end", "end_weekday", "end_hour", "timetable_requirement", "occupancy_at_seizure",
    "tolerance_exceeded", "road", "seized_at", "remaining_slack", "remaining_slack_days",
    "units_maintained",
];

/// Column names of [`SnapshotRow`], in write order.
pub const SNAPSHOT_COLUMNS: [&str; 13] = [
    "tick", "weekday", "hour", "roads_free", "staff_in_use", "occupancy",
    "timetable_requirement", "shunting", "trains_available", "spare_units",
    "live_requests", "units_in_service", "peak",
];

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRow {
    pub unit:                  u32,
    pub activity:              String,
    pub requested_at:          u64,
    pub deadline:              u64,
    pub start:                 u64,
    pub start_weekday:         &'static str,
    pub start_hour:            f64,
    pub end:                   u64,
    pub end_weekday:           &'static str,
    pub end_hour:              f64,
    pub timetable_requirement: u32,
    pub occupancy_at_seizure:  u32,
    pub tolerance_exceeded:    bool,
    pub road:                  String,
    pub seized_at:             u64,
    pub remaining_slack:       i64,
    pub remaining_slack_days:  f64,
    pub units_maintained:      u32,
}

impl From<&CompletionRecord> for CompletionRow {
    fn from(r: &CompletionRecord) -> Self {
        Self {
            unit:                  r.unit.0,
            activity:              r.activity.clone(),
            requested_at:          r.requested_at.0,
            deadline:              r.deadline.0,
            start:                 r.start.0,
            start_weekday:         r.start_weekday.name(),
            start_hour:            r.start_hour,
            end:                   r.end.0,
            end_weekday:           r.end_weekday.name(),
            end_hour:              r.end_hour,
            timetable_requirement: r.timetable_requirement,
            occupancy_at_seizure:  r.occupancy_at_seizure,
            tolerance_exceeded:    r.tolerance_exceeded,
            road:                  r.road.clone(),
            seized_at:             r.seized_at.0,
            remaining_slack:       r.remaining_slack,
            remaining_slack_days:  r.remaining_slack_days,
            units_maintained:      r.units_maintained,
        }
    }
}

/// Depot state at the end of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotRow {
    pub tick:                  u64,
    pub weekday:               &'static str,
    pub hour:                  f64,
    pub roads_free:            u32,
    pub staff_in_use:          u32,
    pub occupancy:             u32,
    pub timetable_requirement: u32,
    /// `INJECTION` or `RECEPTION`.
    pub shunting:              &'static str,
    pub trains_available:      i64,
    pub spare_units:           i64,
    pub live_requests:         u32,
    pub units_in_service:      i64,
    pub peak:                  bool,
}

impl From<&DepotSnapshot> for SnapshotRow {
    fn from(s: &DepotSnapshot) -> Self {
        Self {
            tick:                  s.tick.0,
            weekday:               s.weekday.name(),
            hour:                  s.hour,
            roads_free:            s.roads_free as u32,
            staff_in_use:          s.staff_in_use,
            occupancy:             s.occupancy,
            timetable_requirement: s.timetable_requirement,
            shunting:              s.shunting.as_str(),
            trains_available:      s.trains_available,
            spare_units:           s.spare_units,
            live_requests:         s.live_requests,
            units_in_service:      s.units_in_service,
            peak:                  s.peak,
        }
    }
}
