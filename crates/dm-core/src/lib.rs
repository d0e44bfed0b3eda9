//! `dm-core` — foundational types for the `rust_depot` simulation framework.
//!
//! This crate is a dependency of every other `dm-*` crate.  It has no `dm-*`
//! dependencies and minimal external ones (only `rand` and `thiserror`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`ids`]     | `ProcessId`, `UnitId`, `RoadId`, `ActivityId`, `MachineId` |
//! | [`time`]    | `Tick`, `Weekday`, `Calendar`, `SimConfig`                |
//! | [`rng`]     | `UnitRng` (per-unit), `SimRng` (global)                   |
//! | [`error`]   | `DmError`, `DmResult`                                     |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{DmError, DmResult};
pub use ids::{ActivityId, MachineId, ProcessId, RoadId, UnitId};
pub use rng::{SimRng, UnitRng};
pub use time::{Calendar, SimConfig, Tick, Weekday};
