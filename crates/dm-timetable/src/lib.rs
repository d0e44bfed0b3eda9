//! `dm-timetable` — read-side oracle over a cyclic service timetable.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                    |
//! |---------------|-------------------------------------------------------------|
//! | [`timetable`] | `Timetable` — `demand_at`, `max_demand_over`, `available_capacity` |
//! | [`window`]    | `InjectionWindow` — cyclic unit-insertion blackout periods  |
//! | [`profile`]   | `WeeklyProfile`, `DailyRanges`, peak-period classification  |
//! | [`error`]     | `TimetableError`, `TimetableResult<T>`                      |
//!
//! # Cycle model
//!
//! Both the demand table and the injection window are indexed by
//!
//! ```text
//! slot = tick mod period
//! ```
//!
//! so a one-week table at 15-minute ticks (672 slots) repeats every week of
//! simulated time.  Forward-looking queries wrap across the end of the table
//! by concatenating its tail and head.

pub mod error;
pub mod profile;
pub mod timetable;
pub mod window;

#[cfg(test)]
mod tests;

pub use error::{TimetableError, TimetableResult};
pub use profile::{DailyRanges, WeeklyProfile, is_peak};
pub use timetable::Timetable;
pub use window::InjectionWindow;
