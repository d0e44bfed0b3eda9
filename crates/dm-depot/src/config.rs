//! Run configuration: JSON schema and validation.
//!
//! [`DepotConfig`] is the on-disk form.  [`DepotConfig::validate`] checks it
//! and resolves every string and declared unit into a [`DepotPlan`], so that
//! all configuration errors surface before a single process is spawned.
//!
//! ```json
//! {
//!   "fleet_size": 10,
//!   "sim": { "ticks_per_day": 96, "total_ticks": 4032, "seed": 7 },
//!   "activities": [{
//!     "name": "A-exam", "interval_unit": "service hour",
//!     "interval": 200, "tolerance": 60, "duration_ticks": 20,
//!     "applicability": "by train", "staff": 3
//!   }],
//!   "roads": ["road 1", "road 2"],
//!   "eligibility": { "A-exam": ["road 1", "road 2"] },
//!   "timetable": { "flat": 8 },
//!   "injection": { "daily": [[5.0, 6.0]] }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use dm_core::{ActivityId, Calendar, RoadId, SimConfig, UnitId};
use dm_timetable::{DailyRanges, InjectionWindow, Timetable, WeeklyProfile};
use serde::{Deserialize, Serialize};

use crate::{ConversionFactors, DepotError, DepotResult, IntervalUnit, UsageProfile};

// ── Enumerations ──────────────────────────────────────────────────────────────

/// Whether an activity maintains a single unit or a coupled pair.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Applicability {
    #[default]
    #[serde(rename = "by unit")]
    ByUnit,
    #[serde(rename = "by train")]
    ByTrain,
}

impl Applicability {
    /// Units counted as maintained by one completion.
    pub fn units_maintained(self) -> u32 {
        match self {
            Applicability::ByUnit  => 1,
            Applicability::ByTrain => 2,
        }
    }
}

/// How unit ages (calendar days) are assigned at setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgeModel {
    /// `age_n = n × span_days / fleet_size`.
    Even { span_days: f64 },
    /// Uniform in `[0, span_days)` from each unit's own RNG.
    Random { span_days: f64 },
    /// One age per unit, in unit order.
    Explicit { ages_days: Vec<f64> },
}

impl Default for AgeModel {
    fn default() -> Self {
        AgeModel::Even { span_days: 365.0 }
    }
}

/// Time from a completion to the next request of the same activity.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceModel {
    /// Exactly one interval (individual-unit studies).
    #[default]
    Fixed,
    /// Exponentially distributed with mean = interval (fleet-level studies).
    Exponential,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimetableSource {
    /// Explicit cyclic demand, one value per tick.
    Slots(Vec<u32>),
    /// Constant demand.
    Flat(u32),
    /// One generated week.
    Weekly(WeeklyProfile),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionSource {
    /// No blackout.
    #[default]
    Clear,
    /// Explicit cyclic mask aligned with the timetable.
    Slots(Vec<bool>),
    /// Hour ranges repeated every day.
    Daily(DailyRanges),
}

// ── DepotConfig ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivityConfig {
    pub name:           String,
    /// One of `service hour`, `service day`, `calendar day`, `mileage`.
    pub interval_unit:  String,
    pub interval:       f64,
    pub tolerance:      f64,
    pub duration_ticks: u64,
    #[serde(default)]
    pub applicability:  Applicability,
    /// Staff reserved while the activity is in service.
    #[serde(default)]
    pub staff:          u32,
    /// Restrict the activity to these unit indices (default: every unit).
    #[serde(default)]
    pub units:          Option<Vec<u32>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepotConfig {
    pub fleet_size:        u32,
    #[serde(default = "default_fleet_name")]
    pub fleet_name:        String,
    #[serde(default)]
    pub sim:               SimConfig,
    /// Units already in the depot (casualties) for the whole run.
    #[serde(default)]
    pub initial_occupancy: u32,
    #[serde(default)]
    pub usage:             UsageProfile,
    #[serde(default)]
    pub ages:              AgeModel,
    #[serde(default)]
    pub recurrence:        RecurrenceModel,
    pub activities:        Vec<ActivityConfig>,
    pub roads:             Vec<String>,
    /// Activity name → names of the roads able to host it.
    pub eligibility:       BTreeMap<String, Vec<String>>,
    pub timetable:         TimetableSource,
    #[serde(default)]
    pub injection:         InjectionSource,
}

fn default_fleet_name() -> String {
    "fleet".to_owned()
}

/// A validated activity with every interval converted to ticks.
#[derive(Clone, Debug, PartialEq)]
pub struct Activity {
    pub id:              ActivityId,
    pub name:            String,
    pub unit:            IntervalUnit,
    pub interval_days:   f64,
    pub interval_ticks:  u64,
    pub tolerance_ticks: u64,
    pub duration_ticks:  u64,
    pub applicability:   Applicability,
    pub staff:           u32,
    pub eligible:        BTreeSet<RoadId>,
    pub units:           Option<BTreeSet<UnitId>>,
}

impl Activity {
    pub fn applies_to(&self, unit: UnitId) -> bool {
        self.units.as_ref().is_none_or(|set| set.contains(&unit))
    }
}

/// Everything the depot model needs, resolved and checked.
#[derive(Clone, Debug)]
pub struct DepotPlan {
    pub sim:               SimConfig,
    pub calendar:          Calendar,
    pub fleet_size:        u32,
    pub fleet_name:        String,
    pub initial_occupancy: u32,
    pub factors:           ConversionFactors,
    pub ages:              AgeModel,
    pub recurrence:        RecurrenceModel,
    pub activities:        Vec<Activity>,
    pub roads:             Vec<String>,
    pub timetable:         Timetable,
    pub injection:         InjectionWindow,
}

fn config_err(msg: impl Into<String>) -> DepotError {
    DepotError::Config(msg.into())
}

impl DepotConfig {
    pub fn from_json(json: &str) -> DepotResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> DepotResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Check the configuration and resolve it into a [`DepotPlan`].
    pub fn validate(&self) -> DepotResult<DepotPlan> {
        if self.fleet_size == 0 {
            return Err(config_err("fleet_size must be > 0"));
        }
        if self.sim.ticks_per_day == 0 {
            return Err(config_err("sim.ticks_per_day must be > 0"));
        }
        let calendar = self.sim.calendar();

        let roads = self.validate_roads()?;
        let timetable = self.build_timetable(&calendar)?;
        let injection = self.build_injection(&calendar, timetable.len())?;
        self.validate_ages()?;

        let factors = self.usage.resolve(self.fleet_size, &timetable, &calendar);

        let mut seen = BTreeSet::new();
        let mut activities = Vec::with_capacity(self.activities.len());
        for (i, a) in self.activities.iter().enumerate() {
            if !seen.insert(a.name.as_str()) {
                return Err(config_err(format!("duplicate activity {:?}", a.name)));
            }
            let id = ActivityId::try_from(i)
                .map_err(|_| config_err("too many activities"))?;
            activities.push(self.resolve_activity(id, a, &roads, &factors, &calendar)?);
        }

        Ok(DepotPlan {
            sim: self.sim.clone(),
            calendar,
            fleet_size: self.fleet_size,
            fleet_name: self.fleet_name.clone(),
            initial_occupancy: self.initial_occupancy,
            factors,
            ages: self.ages.clone(),
            recurrence: self.recurrence,
            activities,
            roads: self.roads.clone(),
            timetable,
            injection,
        })
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn validate_roads(&self) -> DepotResult<BTreeMap<&str, RoadId>> {
        if self.roads.is_empty() {
            return Err(config_err("at least one road is required"));
        }
        let mut by_name = BTreeMap::new();
        for (i, name) in self.roads.iter().enumerate() {
            let id = RoadId::try_from(i).map_err(|_| config_err("too many roads"))?;
            if by_name.insert(name.as_str(), id).is_some() {
                return Err(config_err(format!("duplicate road {name:?}")));
            }
        }
        Ok(by_name)
    }

    fn build_timetable(&self, calendar: &Calendar) -> DepotResult<Timetable> {
        let slots = match &self.timetable {
            TimetableSource::Slots(s)   => s.clone(),
            TimetableSource::Flat(d)    => vec![*d],
            TimetableSource::Weekly(p)  => p.generate(calendar),
        };
        Ok(Timetable::new(slots, self.fleet_size)?)
    }

    fn build_injection(&self, calendar: &Calendar, period: usize) -> DepotResult<InjectionWindow> {
        Ok(match &self.injection {
            InjectionSource::Clear => InjectionWindow::clear(period),
            InjectionSource::Slots(mask) => {
                if mask.len() != period {
                    return Err(dm_timetable::TimetableError::PeriodMismatch {
                        demand: period,
                        window: mask.len(),
                    }
                    .into());
                }
                InjectionWindow::new(mask.clone())?
            }
            InjectionSource::Daily(ranges) => {
                InjectionWindow::from_daily(ranges, calendar, calendar.ticks_per_day as usize)?
            }
        })
    }

    fn validate_ages(&self) -> DepotResult<()> {
        match &self.ages {
            AgeModel::Even { span_days } | AgeModel::Random { span_days } => {
                if !(*span_days >= 0.0 && span_days.is_finite()) {
                    return Err(config_err(format!("invalid age span {span_days}")));
                }
            }
            AgeModel::Explicit { ages_days } => {
                if ages_days.len() != self.fleet_size as usize {
                    return Err(config_err(format!(
                        "{} explicit ages for a fleet of {}",
                        ages_days.len(),
                        self.fleet_size
                    )));
                }
                if ages_days.iter().any(|a| *a < 0.0 || !a.is_finite()) {
                    return Err(config_err("unit ages must be non-negative"));
                }
            }
        }
        Ok(())
    }

    fn resolve_activity(
        &self,
        id:       ActivityId,
        a:        &ActivityConfig,
        roads:    &BTreeMap<&str, RoadId>,
        factors:  &ConversionFactors,
        calendar: &Calendar,
    ) -> DepotResult<Activity> {
        let unit = IntervalUnit::parse(&a.interval_unit).ok_or_else(|| {
            DepotError::UnrecognizedIntervalUnit {
                activity: a.name.clone(),
                unit:     a.interval_unit.clone(),
            }
        })?;
        if !(a.interval > 0.0 && a.interval.is_finite()) {
            return Err(config_err(format!("activity {:?}: interval must be > 0", a.name)));
        }
        if !(a.tolerance >= 0.0 && a.tolerance.is_finite()) {
            return Err(config_err(format!("activity {:?}: tolerance must be ≥ 0", a.name)));
        }
        if a.duration_ticks == 0 {
            return Err(config_err(format!("activity {:?}: duration must be ≥ 1 tick", a.name)));
        }

        let names = self
            .eligibility
            .get(&a.name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| config_err(format!("activity {:?} has no eligible roads", a.name)))?;
        let eligible = names
            .iter()
            .map(|road| {
                roads.get(road.as_str()).copied().ok_or_else(|| DepotError::UnknownRoad {
                    activity: a.name.clone(),
                    road:     road.clone(),
                })
            })
            .collect::<DepotResult<BTreeSet<_>>>()?;

        let units = match &a.units {
            None => None,
            Some(list) => {
                if let Some(bad) = list.iter().find(|u| **u >= self.fleet_size) {
                    return Err(config_err(format!(
                        "activity {:?}: unit {bad} outside a fleet of {}",
                        a.name, self.fleet_size
                    )));
                }
                Some(list.iter().map(|u| UnitId(*u)).collect())
            }
        };

        Ok(Activity {
            id,
            name: a.name.clone(),
            unit,
            interval_days:   factors.days(unit, a.interval)?,
            interval_ticks:  factors.ticks(unit, a.interval, calendar)?,
            tolerance_ticks: factors.ticks(unit, a.tolerance, calendar)?,
            duration_ticks:  a.duration_ticks,
            applicability:   a.applicability,
            staff:           a.staff,
            eligible,
            units,
        })
    }
}
