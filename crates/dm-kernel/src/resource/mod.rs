//! Resource primitives.
//!
//! | Type                  | Grant order                      | Notes                              |
//! |-----------------------|----------------------------------|------------------------------------|
//! | [`Resource`]          | FIFO by arrival                  | capacity `C` mutual exclusion      |
//! | [`PriorityResource`]  | `(priority, arrival)` ascending  | lower number wins                  |
//! | [`PreemptiveResource`]| as above                         | evicts a strictly lower-priority holder when full |
//! | [`FilterStore`]       | waiting gets in FIFO, first item that satisfies the predicate | typed items |
//!
//! Every request returns a [`Ticket`].  Grants are never delivered
//! synchronously: the resource records the holder and schedules
//! `Wake::Granted(ticket)` for the requester at the current tick, so the
//! requester must `Yield::Wait` after requesting.  An interrupt does not
//! cancel a pending grant: a requester that handles the interrupt and waits
//! again still receives it, and one that sleeps first receives it at its
//! next wait.  Releasing or cancelling the ticket withdraws an undelivered
//! grant.
//!
//! Releasing a ticket that is not currently held fails with
//! `KernelError::ResourceMisuse`; `cancel` is the lenient exit path that
//! withdraws a queued request or releases a held one, whichever applies.

mod fifo;
mod priority;
mod store;

use std::fmt;

pub use fifo::Resource;
pub use priority::{PreemptiveResource, PriorityResource};
pub use store::FilterStore;

/// Identifies one request against a resource.  Globally increasing, so it
/// also encodes arrival order.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
