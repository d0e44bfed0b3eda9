//! `dm-kernel` — discrete-event simulation kernel for the rust_depot framework.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                     |
//! |---------------|--------------------------------------------------------------|
//! | [`queue`]     | `EventQueue<P>` — virtual clock + `(due, seq)`-ordered heap  |
//! | [`process`]   | `Process` trait, `Wake`, `Yield`, `Interrupt`, `Cause`       |
//! | [`scheduler`] | `Scheduler` (process states, wake-ups, tickets), `Cx`        |
//! | [`sim`]       | `Simulation<C>` — owns process bodies and drives the loop    |
//! | [`resource`]  | `Resource`, `PriorityResource`, `PreemptiveResource`, `FilterStore` |
//! | [`error`]     | `KernelError`, `KernelResult<T>`                             |
//!
//! # Execution model
//!
//! ```text
//! loop:
//!   ① pop the (due, seq)-minimum event; the clock jumps to `due`
//!   ② take the target process body out of the registry
//!   ③ resume(body, wake) → Yield
//!        Timeout(d)  → schedule a wake-up d ticks ahead
//!        Wait        → sleep until a resource grants a ticket
//!        Join(p)     → sleep until process p terminates
//!        Done        → on_exit(), wake joiners, drop the body
//!   ④ register any processes spawned during ③ (they start at `now`)
//! ```
//!
//! Exactly one process runs per popped event.  Shared model state lives in
//! the `C` context owned by [`Simulation`]; it is only ever mutated from
//! inside `resume`, so no locking is required.

pub mod error;
pub mod process;
pub mod queue;
pub mod resource;
pub mod scheduler;
pub mod sim;

#[cfg(test)]
mod tests;

pub use error::{KernelError, KernelResult};
pub use process::{Cause, Interrupt, ProcState, Process, WaitOn, Wake, Yield};
pub use queue::{Event, EventId, EventQueue};
pub use resource::{FilterStore, PreemptiveResource, PriorityResource, Resource, Ticket};
pub use scheduler::{Cx, Scheduler, Wakeup};
pub use sim::Simulation;
