//! Generated timetables and daily hour ranges.
//!
//! Peak periods follow the depot's operating day: weekdays 05:00–10:00 and
//! 16:00–19:00.  Weekends have no peak.

use dm_core::{Calendar, Tick};

use crate::{TimetableError, TimetableResult};

const MORNING_PEAK: (f64, f64) = (5.0, 10.0);
const EVENING_PEAK: (f64, f64) = (16.0, 19.0);

/// `true` if `tick` falls inside a weekday peak period.
pub fn is_peak(calendar: &Calendar, tick: Tick) -> bool {
    if calendar.weekday(tick).is_weekend() {
        return false;
    }
    let h = calendar.time_of_day_hours(tick);
    (MORNING_PEAK.0..MORNING_PEAK.1).contains(&h) || (EVENING_PEAK.0..EVENING_PEAK.1).contains(&h)
}

/// Three-level weekly demand profile.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeeklyProfile {
    /// Units required during weekday peaks.
    pub weekday_peak:     u32,
    /// Units required on weekdays outside the peaks.
    pub weekday_off_peak: u32,
    /// Units required all day on Saturday and Sunday.
    pub weekend_level:    u32,
}

impl WeeklyProfile {
    /// One week of demand slots, starting at the calendar's tick 0.
    pub fn generate(&self, calendar: &Calendar) -> Vec<u32> {
        (0..calendar.ticks_per_week())
            .map(Tick)
            .map(|t| {
                if calendar.weekday(t).is_weekend() {
                    self.weekend_level
                } else if is_peak(calendar, t) {
                    self.weekday_peak
                } else {
                    self.weekday_off_peak
                }
            })
            .collect()
    }
}

/// A set of `[start_hour, end_hour)` ranges repeated every day.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct DailyRanges(pub Vec<(f64, f64)>);

impl DailyRanges {
    pub fn validate(&self) -> TimetableResult<()> {
        for &(start, end) in &self.0 {
            if !(0.0..=24.0).contains(&start) || !(0.0..=24.0).contains(&end) || start >= end {
                return Err(TimetableError::InvalidHours { start, end });
            }
        }
        Ok(())
    }

    pub fn contains(&self, hour: f64) -> bool {
        self.0.iter().any(|&(start, end)| hour >= start && hour < end)
    }
}
