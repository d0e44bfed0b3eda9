//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing `Tick` counter.  The
//! mapping to the calendar is held in `Calendar`:
//!
//!   day_index   = tick / ticks_per_day
//!   weekday     = start_weekday + day_index (mod 7)
//!   time_of_day = (tick mod ticks_per_day) * 24 / ticks_per_day   [hours]
//!
//! Using an integer tick as the canonical time unit means all schedule
//! arithmetic is exact and the event queue can order events without any
//! floating-point comparisons.  Only the unit-conversion layer (service
//! hours, mileage, …) works in `f64`, and it rounds up into whole ticks.
//!
//! The depot model runs on 15-minute ticks (96 per day); the workshop model
//! runs on 1-minute ticks.  The rest of the framework is agnostic.

use std::fmt;
use std::str::FromStr;

use crate::DmError;

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0 - earlier.0
    }

    /// Signed distance `self - other`, for slack computations that may go
    /// negative.
    #[inline]
    pub fn signed_diff(self, other: Tick) -> i64 {
        self.0 as i64 - other.0 as i64
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── Weekday ───────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Weekday {
    #[default]
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Zero-based position in the week (Monday = 0).
    #[inline]
    pub fn number_from_monday(self) -> u64 {
        self as u64
    }

    /// The weekday `days` after `self`.
    pub fn plus_days(self, days: u64) -> Weekday {
        Self::ALL[((self.number_from_monday() + days % 7) % 7) as usize]
    }

    pub fn is_weekend(self) -> bool {
        matches!(self, Weekday::Saturday | Weekday::Sunday)
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday    => "Monday",
            Weekday::Tuesday   => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday  => "Thursday",
            Weekday::Friday    => "Friday",
            Weekday::Saturday  => "Saturday",
            Weekday::Sunday    => "Sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = DmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.name().to_ascii_lowercase() == lower || d.name()[..3].to_ascii_lowercase() == lower)
            .ok_or_else(|| DmError::Parse(format!("invalid weekday {s:?}")))
    }
}

// ── Calendar ──────────────────────────────────────────────────────────────────

/// Maps ticks onto days, weekdays and time of day.
///
/// `Calendar` is cheap to copy and holds no heap data.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Calendar {
    /// How many ticks make up one calendar day.  96 = 15-minute slots.
    pub ticks_per_day: u32,
    /// Weekday of tick 0.
    pub start_weekday: Weekday,
}

impl Calendar {
    pub fn new(ticks_per_day: u32, start_weekday: Weekday) -> Self {
        debug_assert!(ticks_per_day > 0, "ticks_per_day must be > 0");
        Self { ticks_per_day, start_weekday }
    }

    /// Whole days elapsed since tick 0.
    #[inline]
    pub fn day_index(&self, tick: Tick) -> u64 {
        tick.0 / self.ticks_per_day as u64
    }

    /// Tick offset within the current day.
    #[inline]
    pub fn tick_of_day(&self, tick: Tick) -> u32 {
        (tick.0 % self.ticks_per_day as u64) as u32
    }

    pub fn weekday(&self, tick: Tick) -> Weekday {
        self.start_weekday.plus_days(self.day_index(tick))
    }

    /// Time of day in fractional hours (`0.0 ≤ h < 24.0`).
    pub fn time_of_day_hours(&self, tick: Tick) -> f64 {
        self.tick_of_day(tick) as f64 * 24.0 / self.ticks_per_day as f64
    }

    #[inline]
    pub fn ticks_per_week(&self) -> u64 {
        self.ticks_per_day as u64 * 7
    }

    /// How many ticks span `days` calendar days?  Rounds up so a deadline is
    /// never pulled earlier by the conversion.  Negative input yields 0.
    pub fn ticks_for_days(&self, days: f64) -> u64 {
        (days * self.ticks_per_day as f64).ceil().max(0.0) as u64
    }

    /// Convert a (possibly negative) tick span back into fractional days.
    pub fn days_for_ticks(&self, ticks: i64) -> f64 {
        ticks as f64 / self.ticks_per_day as f64
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::new(96, Weekday::Monday)
    }
}

// ── SimConfig ─────────────────────────────────────────────────────────────────

/// Run-level simulation configuration shared by every model.
///
/// With the `serde` feature, missing fields take their `Default` values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(default))]
pub struct SimConfig {
    /// Ticks per calendar day.  Default: 96 (15-minute slots).
    pub ticks_per_day: u32,

    /// Weekday of tick 0.
    pub start_weekday: Weekday,

    /// Total ticks to simulate (exclusive horizon).  Six weeks at 15 minutes
    /// per tick is 6 * 672 = 4032.
    pub total_ticks: u64,

    /// Master RNG seed.  The same seed always produces identical results.
    pub seed: u64,

    /// Emit a snapshot every N ticks.  1 = every tick; 0 disables snapshots.
    pub output_interval_ticks: u64,
}

impl SimConfig {
    /// The tick at which the simulation ends (exclusive upper bound).
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.total_ticks)
    }

    pub fn calendar(&self) -> Calendar {
        Calendar::new(self.ticks_per_day, self.start_weekday)
    }

    /// `true` if a snapshot is due at `tick`.
    #[inline]
    pub fn snapshot_due(&self, tick: Tick) -> bool {
        self.output_interval_ticks > 0 && tick.0.is_multiple_of(self.output_interval_ticks)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_day:         96,
            start_weekday:         Weekday::Monday,
            total_ticks:           672 * 6,
            seed:                  42,
            output_interval_ticks: 1,
        }
    }
}
