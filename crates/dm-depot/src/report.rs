//! End-of-run summary.

use std::collections::BTreeMap;

use dm_core::{Tick, UnitId};
use serde::Serialize;

use crate::{CompletionRecord, DepotSnapshot, DepotState, RunWarning};

/// A request still open at the horizon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutstandingRequest {
    pub unit:         UnitId,
    pub activity:     String,
    pub requested_at: Tick,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub ticks:                u64,
    pub requests_raised:      u64,
    pub completions:          u64,
    /// Completions that started with the tolerance already exceeded.
    pub overrides:            u64,
    /// `completions / requests_raised × 100`.
    pub performance_pct:      f64,
    /// Units maintained per activity name.
    pub units_maintained:     BTreeMap<String, u64>,
    pub peak_staff:           u32,
    /// Sum over ticks of staff in use.
    pub staff_ticks:          u64,
    pub mean_occupancy:       f64,
    /// Share of ticks on which the timetable was fully covered.
    pub timetable_met_pct:    f64,
    pub road_utilisation_pct: BTreeMap<String, f64>,
    pub outstanding:          Vec<OutstandingRequest>,
    pub warnings:             Vec<RunWarning>,
}

/// Per-tick accumulators behind [`RunReport`].
#[derive(Default)]
pub(crate) struct RunStats {
    ticks:            u64,
    completions:      u64,
    overrides:        u64,
    units_maintained: BTreeMap<String, u64>,
    staff_ticks:      u64,
    occupancy_ticks:  u64,
    met_ticks:        u64,
    road_busy:        Vec<u64>,
    warnings:         Vec<RunWarning>,
}

impl RunStats {
    pub(crate) fn record_completion(&mut self, record: &CompletionRecord) {
        self.completions += 1;
        if record.tolerance_exceeded {
            self.overrides += 1;
        }
        *self.units_maintained.entry(record.activity.clone()).or_default() +=
            record.units_maintained as u64;
    }

    pub(crate) fn record_warning(&mut self, warning: RunWarning) {
        self.warnings.push(warning);
    }

    pub(crate) fn record_tick(&mut self, snapshot: &DepotSnapshot, road_in_use: impl Iterator<Item = bool>) {
        self.ticks += 1;
        self.staff_ticks += snapshot.staff_in_use as u64;
        self.occupancy_ticks += snapshot.occupancy as u64;
        if snapshot.spare_units >= 0 {
            self.met_ticks += 1;
        }
        for (i, busy) in road_in_use.enumerate() {
            if i >= self.road_busy.len() {
                self.road_busy.resize(i + 1, 0);
            }
            self.road_busy[i] += busy as u64;
        }
    }

    pub(crate) fn build(&self, state: &DepotState, road_names: &[String]) -> RunReport {
        let pct = |part: u64, whole: u64| {
            if whole == 0 { 0.0 } else { part as f64 / whole as f64 * 100.0 }
        };
        let outstanding = state
            .registry
            .outstanding()
            .map(|r| OutstandingRequest {
                unit:         r.unit,
                activity:     state.activity(r.activity).name.clone(),
                requested_at: r.requested_at,
            })
            .collect();
        let road_utilisation_pct = road_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let busy = self.road_busy.get(i).copied().unwrap_or(0);
                (name.clone(), pct(busy, self.ticks))
            })
            .collect();

        RunReport {
            ticks:                self.ticks,
            requests_raised:      state.requests_raised,
            completions:          self.completions,
            overrides:            self.overrides,
            performance_pct:      pct(self.completions, state.requests_raised),
            units_maintained:     self.units_maintained.clone(),
            peak_staff:           state.staff.peak(),
            staff_ticks:          self.staff_ticks,
            mean_occupancy:       if self.ticks == 0 {
                0.0
            } else {
                self.occupancy_ticks as f64 / self.ticks as f64
            },
            timetable_met_pct:    pct(self.met_ticks, self.ticks),
            road_utilisation_pct,
            outstanding,
            warnings:             self.warnings.clone(),
        }
    }
}
