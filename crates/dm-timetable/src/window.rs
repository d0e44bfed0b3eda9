//! Injection (unit-insertion) blackout windows.

use dm_core::{Calendar, Tick};

use crate::{DailyRanges, TimetableError, TimetableResult};

/// Cyclic boolean mask: `true` while units are being injected into service
/// and no maintenance may start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InjectionWindow {
    blackout: Vec<bool>,
}

impl InjectionWindow {
    /// Build from an explicit mask.  At least one slot must be clear.
    pub fn new(blackout: Vec<bool>) -> TimetableResult<Self> {
        if blackout.is_empty() {
            return Err(TimetableError::Empty { what: "injection window" });
        }
        if blackout.iter().all(|b| *b) {
            return Err(TimetableError::NeverClear);
        }
        Ok(Self { blackout })
    }

    /// A window with no blackout at all.
    pub fn clear(period: usize) -> Self {
        Self { blackout: vec![false; period.max(1)] }
    }

    /// Repeat the same daily hour ranges every day of a `period`-tick cycle.
    pub fn from_daily(ranges: &DailyRanges, calendar: &Calendar, period: usize) -> TimetableResult<Self> {
        ranges.validate()?;
        let blackout = (0..period as u64)
            .map(|t| ranges.contains(calendar.time_of_day_hours(Tick(t))))
            .collect();
        Self::new(blackout)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blackout.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blackout.is_empty()
    }

    #[inline]
    pub fn is_blackout(&self, tick: Tick) -> bool {
        self.blackout[(tick.0 % self.blackout.len() as u64) as usize]
    }

    /// First tick `≥ tick` outside a blackout.
    pub fn next_clear(&self, tick: Tick) -> Tick {
        let mut t = tick;
        // Terminates within one period: construction guarantees a clear slot.
        for _ in 0..self.blackout.len() {
            if !self.is_blackout(t) {
                return t;
            }
            t = t + 1;
        }
        t
    }
}
