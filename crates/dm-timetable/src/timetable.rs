//! The demand oracle.

use dm_core::Tick;

use crate::{TimetableError, TimetableResult};

/// Required in-service unit count per tick, repeating with period `len()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timetable {
    demand:     Vec<u32>,
    fleet_size: u32,
}

impl Timetable {
    pub fn new(demand: Vec<u32>, fleet_size: u32) -> TimetableResult<Self> {
        if demand.is_empty() {
            return Err(TimetableError::Empty { what: "timetable" });
        }
        Ok(Self { demand, fleet_size })
    }

    /// Constant demand, one slot long.
    pub fn flat(level: u32, fleet_size: u32) -> Self {
        Self { demand: vec![level], fleet_size }
    }

    /// Cycle period in ticks.
    #[inline]
    pub fn len(&self) -> usize {
        self.demand.len()
    }

    /// Always `false`; an empty timetable cannot be constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.demand.is_empty()
    }

    #[inline]
    pub fn fleet_size(&self) -> u32 {
        self.fleet_size
    }

    pub fn slots(&self) -> &[u32] {
        &self.demand
    }

    #[inline]
    fn slot(&self, tick: Tick) -> usize {
        (tick.0 % self.demand.len() as u64) as usize
    }

    #[inline]
    pub fn demand_at(&self, tick: Tick) -> u32 {
        self.demand[self.slot(tick)]
    }

    /// Maximum demand over `window_len` consecutive cyclic ticks starting at
    /// `start`.
    ///
    /// A zero-length window is treated as the single tick at `start`.  A
    /// window at least one period long covers the whole table.
    pub fn max_demand_over(&self, start: Tick, window_len: u64) -> u32 {
        let n = self.demand.len();
        let len = window_len.max(1);
        if len >= n as u64 {
            return self.demand.iter().copied().max().unwrap_or(0);
        }
        let len = len as usize;
        let pos = self.slot(start);
        let end = pos + len;
        let head = &self.demand[pos..end.min(n)];
        let tail = if end > n { &self.demand[..end - n] } else { &[][..] };
        head.iter().chain(tail).copied().max().unwrap_or(0)
    }

    /// `fleet_size − demand_at(tick)`.  Negative when the timetable asks for
    /// more units than the fleet has.
    #[inline]
    pub fn available_capacity(&self, tick: Tick) -> i64 {
        self.fleet_size as i64 - self.demand_at(tick) as i64
    }

    /// `fleet_size − max_demand_over(start, window_len)`: units that can be
    /// withdrawn for the whole window without missing the timetable.
    #[inline]
    pub fn max_future_capacity(&self, start: Tick, window_len: u64) -> i64 {
        self.fleet_size as i64 - self.max_demand_over(start, window_len) as i64
    }

    /// Maximum demand over the slots selected by `keep`, or `None` if no slot
    /// is selected.
    pub fn peak_where<F>(&self, mut keep: F) -> Option<u32>
    where
        F: FnMut(Tick) -> bool,
    {
        self.demand
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(Tick(*i as u64)))
            .map(|(_, d)| *d)
            .max()
    }
}
