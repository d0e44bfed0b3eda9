//! Depot observer trait for telemetry and progress reporting.

use dm_core::Tick;

use crate::{CompletionRecord, DepotSnapshot, RunReport, RunWarning};

/// Callbacks invoked by [`Depot::run`][crate::Depot::run] at tick
/// boundaries.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
pub trait DepotObserver {
    /// Called before any event of `tick` is processed.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called once per completed activity, in completion order.
    fn on_completion(&mut self, _record: &CompletionRecord) {}

    /// Called at snapshot intervals with the state at the end of the tick.
    fn on_snapshot(&mut self, _snapshot: &DepotSnapshot) {}

    fn on_warning(&mut self, _warning: &RunWarning) {}

    /// Called once after the final tick.
    fn on_sim_end(&mut self, _final_tick: Tick, _report: &RunReport) {}
}

/// A [`DepotObserver`] that does nothing.
pub struct NoopObserver;

impl DepotObserver for NoopObserver {}
