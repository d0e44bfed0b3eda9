//! `dm-workshop` — equipment availability under breakdowns.
//!
//! Each machine makes parts until an exponentially timed breakdown
//! interrupts it.  The broken machine claims a repairer at priority 1 from a
//! preemptive crew, evicting background work (priority 2) if the crew is
//! busy.  Evicted background work queues again with only its remaining
//! ticks.
//!
//! | Module      | Contents                                       |
//! |-------------|------------------------------------------------|
//! | [`config`]  | `WorkshopConfig`                               |
//! | [`state`]   | `WorkshopState`, `MachineStats`, priorities    |
//! | [`model`]   | `Workshop` — construction and run              |
//! | [`report`]  | `WorkshopReport`, `MachineReport`              |
//! | [`error`]   | `WorkshopError`, `WorkshopResult<T>`           |

pub mod config;
pub mod error;
pub mod model;
pub mod report;
pub mod state;

mod machine;
mod other;


pub use config::WorkshopConfig;
pub use error::{WorkshopError, WorkshopResult};
pub use model::Workshop;
pub use report::{MachineReport, WorkshopReport};
pub use state::{MachineStats, WorkshopState, OTHER_JOB_PRIORITY, REPAIR_PRIORITY};
