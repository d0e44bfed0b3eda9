//! Interval units and their conversion into ticks.
//!
//! Activity intervals and tolerances are declared in one of four units.
//! Each is first converted to calendar days with a fleet-level usage
//! factor, then to ticks (rounding up):
//!
//! | Unit           | days =                                   |
//! |----------------|------------------------------------------|
//! | `calendar day` | value                                    |
//! | `service day`  | value / service_day_rate                 |
//! | `service hour` | value / service_hours_per_calendar_day   |
//! | `mileage`      | value / mileage_per_calendar_day         |

use std::fmt;

use dm_core::Calendar;
use dm_timetable::Timetable;
use serde::{Deserialize, Serialize};

use crate::{DepotError, DepotResult};

/// Unit of an activity's interval and tolerance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    ServiceHour,
    ServiceDay,
    CalendarDay,
    Mileage,
}

impl IntervalUnit {
    /// Parse `service hour`, `service-day`, `Calendar_Day`, `mileage`, ...
    /// Words may be separated by spaces, dashes or underscores; case is
    /// ignored.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s
            .trim()
            .to_ascii_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        match normalized.as_str() {
            "service hour" => Some(Self::ServiceHour),
            "service day"  => Some(Self::ServiceDay),
            "calendar day" => Some(Self::CalendarDay),
            "mileage"      => Some(Self::Mileage),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::ServiceHour => "service hour",
            Self::ServiceDay  => "service day",
            Self::CalendarDay => "calendar day",
            Self::Mileage     => "mileage",
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── UsageProfile ──────────────────────────────────────────────────────────────

/// How intensively the fleet is used.  Any factor left out is derived.
///
/// * `service_day_rate = (5·weekday_peak + 2·weekend_peak) / (7·fleet)`, the
///   share of calendar days a unit spends in service.  Missing peaks are
///   read off the timetable.
/// * `service_hours_per_calendar_day = service_day_rate × service_hours_per_day`
/// * `mileage_per_calendar_day = weekly_fleet_mileage / fleet / 7`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageProfile {
    pub service_day_rate:               Option<f64>,
    pub service_hours_per_calendar_day: Option<f64>,
    pub mileage_per_calendar_day:       Option<f64>,
    pub weekday_peak:                   Option<f64>,
    pub weekend_peak:                   Option<f64>,
    /// Length of the operating day in hours.
    pub service_hours_per_day:          f64,
    pub weekly_fleet_mileage:           Option<f64>,
}

impl Default for UsageProfile {
    fn default() -> Self {
        Self {
            service_day_rate:               None,
            service_hours_per_calendar_day: None,
            mileage_per_calendar_day:       None,
            weekday_peak:                   None,
            weekend_peak:                   None,
            service_hours_per_day:          17.0,
            weekly_fleet_mileage:           None,
        }
    }
}

impl UsageProfile {
    /// Resolve every derivable factor for a fleet running `timetable`.
    pub fn resolve(
        &self,
        fleet_size: u32,
        timetable:  &Timetable,
        calendar:   &Calendar,
    ) -> ConversionFactors {
        let fleet = fleet_size as f64;
        let overall = timetable.peak_where(|_| true).unwrap_or(0) as f64;
        let peak_on = |weekend: bool| {
            timetable
                .peak_where(|t| calendar.weekday(t).is_weekend() == weekend)
                .map_or(overall, |d| d as f64)
        };
        let weekday_peak = self.weekday_peak.unwrap_or_else(|| peak_on(false));
        let weekend_peak = self.weekend_peak.unwrap_or_else(|| peak_on(true));

        let service_day_rate = self
            .service_day_rate
            .unwrap_or((5.0 * weekday_peak + 2.0 * weekend_peak) / (7.0 * fleet));
        let service_hours_per_calendar_day = self
            .service_hours_per_calendar_day
            .unwrap_or(service_day_rate * self.service_hours_per_day);
        let mileage_per_calendar_day = self
            .mileage_per_calendar_day
            .or(self.weekly_fleet_mileage.map(|m| m / fleet / 7.0));

        ConversionFactors {
            service_day_rate,
            service_hours_per_calendar_day,
            mileage_per_calendar_day,
        }
    }
}

/// Resolved unit → calendar-day factors.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ConversionFactors {
    pub service_day_rate:               f64,
    pub service_hours_per_calendar_day: f64,
    pub mileage_per_calendar_day:       Option<f64>,
}

impl ConversionFactors {
    /// Calendar days per one `unit`, or an error if the factor is missing
    /// or not positive.
    fn divisor(&self, unit: IntervalUnit) -> DepotResult<f64> {
        let factor = match unit {
            IntervalUnit::CalendarDay => Some(1.0),
            IntervalUnit::ServiceDay  => Some(self.service_day_rate),
            IntervalUnit::ServiceHour => Some(self.service_hours_per_calendar_day),
            IntervalUnit::Mileage     => self.mileage_per_calendar_day,
        };
        match factor {
            Some(f) if f > 0.0 && f.is_finite() => Ok(f),
            _ => Err(DepotError::Config(format!(
                "no positive conversion factor for unit {unit:?}"
            ))),
        }
    }

    /// Convert `value` in `unit` into calendar days.
    pub fn days(&self, unit: IntervalUnit, value: f64) -> DepotResult<f64> {
        Ok(value / self.divisor(unit)?)
    }

    /// Convert `value` in `unit` into whole ticks, rounding up.
    pub fn ticks(&self, unit: IntervalUnit, value: f64, calendar: &Calendar) -> DepotResult<u64> {
        Ok(calendar.ticks_for_days(self.days(unit, value)?))
    }
}
