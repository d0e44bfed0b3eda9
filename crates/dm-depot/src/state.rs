//! The shared model context every depot process runs against.
//!
//! All counters here (occupancy, staffing, live requests) are mutated only
//! inside process `resume`/`on_exit` calls, one process at a time.

use dm_core::{ActivityId, Calendar, RoadId, Tick, UnitId, UnitRng};
use dm_kernel::FilterStore;
use dm_timetable::{InjectionWindow, Timetable, is_peak};

use crate::{
    Activity, AgeModel, CompletionRecord, DepotPlan, DepotResult, DepotSnapshot, RecurrenceModel,
    Registry, RunWarning, ShuntingStatus,
};

/// A physical maintenance road, held in the depot's `FilterStore`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Road {
    pub id:   RoadId,
    pub name: String,
}

/// One maintained unit of the fleet.
pub struct Unit {
    pub id:             UnitId,
    /// Age in calendar days at tick 0.
    pub age_days:       f64,
    pub in_maintenance: bool,
    /// Units counted as maintained over the run.
    pub maintained:     u64,
    pub rng:            UnitRng,
}

/// Staff reserved by activities in service.
#[derive(Debug, Default)]
pub struct Staffing {
    in_use: u32,
    peak:   u32,
}

impl Staffing {
    pub fn in_use(&self) -> u32 {
        self.in_use
    }

    /// Highest simultaneous reservation seen.
    pub fn peak(&self) -> u32 {
        self.peak
    }

    pub fn reserve(&mut self, n: u32) {
        self.in_use += n;
        self.peak = self.peak.max(self.in_use);
    }

    /// Release `n` staff.  Returns `false` (and changes nothing) if fewer
    /// than `n` are reserved.
    #[must_use]
    pub fn release(&mut self, n: u32) -> bool {
        match self.in_use.checked_sub(n) {
            Some(left) => {
                self.in_use = left;
                true
            }
            None => false,
        }
    }
}

/// Values published by the timetable updater at its last run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Published {
    pub demand:                u32,
    pub available_to_maintain: i64,
    pub injection:             bool,
    pub trains_available:      i64,
}

pub struct DepotState {
    pub calendar:        Calendar,
    pub fleet_size:      u32,
    pub timetable:       Timetable,
    pub injection:       InjectionWindow,
    pub activities:      Vec<Activity>,
    pub recurrence:      RecurrenceModel,
    pub units:           Vec<Unit>,
    pub roads:           FilterStore<Road>,
    pub staff:           Staffing,
    /// Units inside the depot (admitted, queued for a road, or in service).
    pub occupancy:       u32,
    pub published:       Published,
    pub registry:        Registry,
    /// Requests raised but not yet admitted.
    pub live_requests:   u32,
    pub requests_raised: u64,
    pub(crate) completions: Vec<CompletionRecord>,
    pub(crate) warnings:    Vec<RunWarning>,
}

impl DepotState {
    /// Build the context for `plan`.  The road store starts empty; roads are
    /// put into it once a scheduler exists.
    pub fn new(plan: &DepotPlan) -> DepotResult<Self> {
        let fleet = plan.fleet_size;
        let units = (0..fleet)
            .map(|n| {
                let id = UnitId(n);
                let mut rng = UnitRng::new(plan.sim.seed, id);
                let age_days = match &plan.ages {
                    AgeModel::Even { span_days } => n as f64 * span_days / fleet as f64,
                    AgeModel::Random { span_days } if *span_days > 0.0 => rng.gen_range(0.0..*span_days),
                    AgeModel::Random { .. } => 0.0,
                    AgeModel::Explicit { ages_days } => ages_days.get(n as usize).copied().unwrap_or(0.0),
                };
                Unit { id, age_days, in_maintenance: false, maintained: 0, rng }
            })
            .collect();

        Ok(Self {
            calendar:        plan.calendar,
            fleet_size:      fleet,
            timetable:       plan.timetable.clone(),
            injection:       plan.injection.clone(),
            activities:      plan.activities.clone(),
            recurrence:      plan.recurrence,
            units,
            roads:           FilterStore::new("roads", plan.roads.len())?,
            staff:           Staffing::default(),
            occupancy:       plan.initial_occupancy,
            published:       Published::default(),
            registry:        Registry::new(),
            live_requests:   0,
            requests_raised: 0,
            completions:     Vec::new(),
            warnings:        Vec::new(),
        })
    }

    #[inline]
    pub fn activity(&self, id: ActivityId) -> &Activity {
        &self.activities[id.index()]
    }

    #[inline]
    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id.index()]
    }

    pub fn roads_free(&self) -> usize {
        self.roads.items().len()
    }

    /// `true` if `road` is not currently in the store.
    pub fn road_in_use(&self, road: RoadId) -> bool {
        !self.roads.items().iter().any(|r| r.id == road)
    }

    /// Depot state as it stands now, labelled with `tick`.
    pub fn snapshot(&self, tick: Tick) -> DepotSnapshot {
        let fleet = self.fleet_size as i64;
        let occupancy = self.occupancy as i64;
        let demand = self.published.demand;
        let trains_available = fleet - occupancy;
        DepotSnapshot {
            tick,
            weekday:               self.calendar.weekday(tick),
            hour:                  self.calendar.time_of_day_hours(tick),
            roads_free:            self.roads_free(),
            staff_in_use:          self.staff.in_use(),
            occupancy:             self.occupancy,
            timetable_requirement: demand,
            shunting:              if self.published.injection {
                ShuntingStatus::Injection
            } else {
                ShuntingStatus::Reception
            },
            trains_available,
            spare_units:           trains_available - demand as i64,
            live_requests:         self.live_requests,
            units_in_service:      trains_available.min(demand as i64),
            peak:                  is_peak(&self.calendar, tick),
        }
    }
}
