//! `dm-depot` — maintenance-admission model of a train depot.
//!
//! A fleet of units needs recurring maintenance activities.  Each activity
//! occupies a road in the depot for a fixed duration.  The timetable says
//! how many units must be in service at every tick.  Maintenance is deferred
//! while taking a unit out would break the timetable, until its compliance
//! tolerance runs out and it is admitted regardless.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                    |
//! |----------------|-------------------------------------------------------------|
//! | [`config`]     | `DepotConfig` (JSON), validation into `DepotPlan`, `Activity` |
//! | [`units`]      | `IntervalUnit`, `UsageProfile`, `ConversionFactors`        |
//! | [`state`]      | `DepotState` (shared process context), `Road`, `Unit`, `Staffing` |
//! | [`registry`]   | `Registry` of open requests, `Request`, `Phase`            |
//! | [`request`]    | request lifecycle processes (lookahead, countdown, admission) |
//! | [`recurrence`] | per-unit recurrence process                                |
//! | [`updater`]    | timetable updater process                                  |
//! | [`model`]      | `Depot` — construction and the tick-driven run loop        |
//! | [`observer`]   | `DepotObserver`, `NoopObserver`                            |
//! | [`record`]     | `CompletionRecord`, `DepotSnapshot`, `RunWarning`          |
//! | [`report`]     | `RunReport`, `OutstandingRequest`                          |
//! | [`error`]      | `DepotError`, `DepotResult<T>`                             |
//!
//! # Quick start
//!
//! ```rust,ignore
//! let config = DepotConfig::load("depot.json")?;
//! let mut depot = Depot::from_config(&config)?;
//! let report = depot.run(&mut NoopObserver)?;
//! println!("{:.1}% of requests completed", report.performance_pct);
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod observer;
pub mod record;
pub mod registry;
pub mod report;
pub mod state;
pub mod units;

mod recurrence;
mod request;
mod updater;


pub use config::{
    Activity, ActivityConfig, AgeModel, Applicability, DepotConfig, DepotPlan, InjectionSource,
    RecurrenceModel, TimetableSource,
};
pub use error::{DepotError, DepotResult};
pub use model::Depot;
pub use observer::{DepotObserver, NoopObserver};
pub use record::{CompletionRecord, DepotSnapshot, RunWarning, ShuntingStatus};
pub use registry::{Phase, Registry, Request, RequestId, Seizure};
pub use report::{OutstandingRequest, RunReport};
pub use state::{DepotState, Published, Road, Staffing, Unit};
pub use units::{ConversionFactors, IntervalUnit, UsageProfile};
