//! The `Depot` model and its tick-driven run loop.

use dm_core::{RoadId, SimConfig, Tick, UnitId};
use dm_kernel::{Cause, Simulation};
use tracing::info;

use crate::recurrence::Recurrence;
use crate::report::RunStats;
use crate::updater::TimetableUpdater;
use crate::{
    DepotConfig, DepotError, DepotObserver, DepotPlan, DepotResult, DepotState, Road, RunReport,
};

/// A depot simulation ready to run.
///
/// Construction spawns, in order: the timetable updater, then one recurrence
/// process per `(unit, activity)` pair in unit-major order.  That order is
/// the same-tick tie-break for the whole run.
///
/// # Run loop
///
/// ```text
/// for tick in now..end:
///   on_tick_start(tick)
///   dispatch every event due at tick
///   forward completions and warnings to the observer
///   on_snapshot(state at end of tick)      (every output_interval_ticks)
/// on_sim_end(end, report)
/// ```
pub struct Depot {
    config:     SimConfig,
    road_names: Vec<String>,
    sim:        Simulation<DepotState>,
    stats:      RunStats,
}

impl Depot {
    pub fn from_config(config: &DepotConfig) -> DepotResult<Self> {
        Self::from_plan(config.validate()?)
    }

    pub fn from_plan(plan: DepotPlan) -> DepotResult<Self> {
        let mut sim = Simulation::new(DepotState::new(&plan)?);
        for (i, name) in plan.roads.iter().enumerate() {
            let road = Road { id: RoadId(i as u32), name: name.clone() };
            sim.state.roads.put(&mut sim.sched, road)?;
        }

        sim.spawn(TimetableUpdater)?;
        for unit in (0..plan.fleet_size).map(UnitId) {
            for activity in plan.activities.iter().filter(|a| a.applies_to(unit)) {
                sim.spawn(Recurrence::new(unit, activity.id))?;
            }
        }
        info!(
            fleet = %plan.fleet_name,
            units = plan.fleet_size,
            activities = plan.activities.len(),
            roads = plan.roads.len(),
            processes = sim.sched.live_processes(),
            "depot model built"
        );

        Ok(Self {
            config: plan.sim,
            road_names: plan.roads,
            sim,
            stats: RunStats::default(),
        })
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.sim.now()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Read-only access to the model state.
    pub fn state(&self) -> &DepotState {
        &self.sim.state
    }

    /// Run from the current tick to `config.end_tick()`.
    pub fn run<O: DepotObserver>(&mut self, observer: &mut O) -> DepotResult<RunReport> {
        info!(from = %self.now(), to = %self.config.end_tick(), seed = self.config.seed, "depot run started");
        while self.now() < self.config.end_tick() {
            self.step_tick(observer)?;
        }
        let report = self.report();
        observer.on_sim_end(self.now(), &report);
        info!(
            completions = report.completions,
            requests = report.requests_raised,
            overrides = report.overrides,
            performance_pct = report.performance_pct,
            "depot run finished"
        );
        Ok(report)
    }

    /// Run exactly `n` ticks from the current position (ignores `end_tick`).
    pub fn run_ticks<O: DepotObserver>(&mut self, n: u64, observer: &mut O) -> DepotResult<()> {
        for _ in 0..n {
            self.step_tick(observer)?;
        }
        Ok(())
    }

    /// Withdraw every open request of `unit` for `activity`.
    ///
    /// Each request process is cancelled at the start of the next tick and
    /// hands back whatever it holds (road, staff, depot place); the unit's
    /// recurrence then re-arms as after a completion.  Returns the number of
    /// requests withdrawn.
    pub fn withdraw(&mut self, unit: UnitId, activity: &str) -> DepotResult<usize> {
        let state = &self.sim.state;
        let Some(id) = state.activities.iter().find(|a| a.name == activity).map(|a| a.id) else {
            return Err(DepotError::Config(format!("unknown activity {activity:?}")));
        };
        if unit.index() >= state.units.len() {
            return Err(DepotError::Config(format!("unknown unit {unit}")));
        }
        let pids: Vec<_> = state
            .registry
            .open_for(unit, id)
            .iter()
            .filter_map(|r| state.registry.get(*r).and_then(|req| req.process))
            .filter(|pid| self.sim.sched.is_alive(*pid))
            .collect();
        for pid in &pids {
            self.sim.interrupt(*pid, Cause::Cancelled)?;
        }
        info!(%unit, activity, withdrawn = pids.len(), now = %self.now(), "requests withdrawn");
        Ok(pids.len())
    }

    /// Summary of everything run so far.
    pub fn report(&self) -> RunReport {
        self.stats.build(&self.sim.state, &self.road_names)
    }

    fn step_tick<O: DepotObserver>(&mut self, observer: &mut O) -> DepotResult<()> {
        let now = self.now();
        observer.on_tick_start(now);
        self.sim.run_until(now + 1)?;

        let state = &mut self.sim.state;
        for record in state.completions.drain(..) {
            self.stats.record_completion(&record);
            observer.on_completion(&record);
        }
        for warning in state.warnings.drain(..) {
            observer.on_warning(&warning);
            self.stats.record_warning(warning);
        }

        let snapshot = state.snapshot(now);
        let in_use = (0..self.road_names.len()).map(|i| state.road_in_use(RoadId(i as u32)));
        self.stats.record_tick(&snapshot, in_use);
        if self.config.snapshot_due(now) {
            observer.on_snapshot(&snapshot);
        }
        Ok(())
    }
}
