//! `EventQueue` — the virtual clock and its pending wake-ups.
//!
//! # Ordering
//!
//! Events are ordered by `(due, seq)` ascending.  `seq` is a monotonically
//! increasing insertion counter, so events due at the same tick pop in the
//! order they were scheduled.  That tie-break is what makes two runs with
//! the same seed and the same scheduling order produce identical results.
//!
//! # Cancellation
//!
//! `cancel` is O(1): the sequence number is dropped from the `pending` set
//! and the heap entry is discarded lazily when it reaches the top.
//!
//! # Clock
//!
//! `now` only ever moves forward, and only to the `due` of a popped event or
//! to an explicit horizon via [`EventQueue::advance_to`].

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use dm_core::Tick;

use crate::{KernelError, KernelResult};

/// Handle to a scheduled event; equal to its insertion sequence number.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct EventId(pub u64);

/// A popped event: due time, tie-break sequence, and the continuation payload.
#[derive(Debug)]
pub struct Event<P> {
    pub due:     Tick,
    pub seq:     u64,
    pub payload: P,
}

impl<P> Event<P> {
    #[inline]
    pub fn id(&self) -> EventId {
        EventId(self.seq)
    }
}

// Heap entry: BinaryHeap is a max-heap, so the ordering is reversed.
struct Entry<P>(Event<P>);

impl<P> PartialEq for Entry<P> {
    fn eq(&self, other: &Self) -> bool {
        self.0.seq == other.0.seq
    }
}
impl<P> Eq for Entry<P> {}
impl<P> PartialOrd for Entry<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<P> Ord for Entry<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.0.due, other.0.seq).cmp(&(self.0.due, self.0.seq))
    }
}

/// Time-ordered queue of pending events plus the current virtual time.
pub struct EventQueue<P> {
    now:      Tick,
    next_seq: u64,
    heap:     BinaryHeap<Entry<P>>,
    pending:  HashSet<u64>,
}

impl<P> Default for EventQueue<P> {
    fn default() -> Self {
        Self {
            now:      Tick::ZERO,
            next_seq: 0,
            heap:     BinaryHeap::new(),
            pending:  HashSet::new(),
        }
    }
}

impl<P> EventQueue<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Schedule `payload` to fire `delay` ticks from now.
    ///
    /// Fails with [`KernelError::InvalidDelay`] if `delay` is negative.
    pub fn schedule(&mut self, delay: i64, payload: P) -> KernelResult<EventId> {
        if delay < 0 {
            return Err(KernelError::InvalidDelay { pid: None, delay, now: self.now });
        }
        Ok(self.push(self.now + delay as u64, payload))
    }

    /// Schedule `payload` at absolute tick `due` (which must not be in the past).
    pub fn schedule_at(&mut self, due: Tick, payload: P) -> KernelResult<EventId> {
        self.schedule(due.signed_diff(self.now), payload)
    }

    /// Cancel a pending event.  Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: EventId) -> bool {
        self.pending.remove(&id.0)
    }

    /// Due time of the next live event, or `None` if the queue is empty.
    pub fn peek_due(&mut self) -> Option<Tick> {
        self.discard_cancelled();
        self.heap.peek().map(|e| e.0.due)
    }

    /// Pop the minimum event and advance the clock to its due time.
    ///
    /// Fails with [`KernelError::QueueExhausted`] when nothing is pending.
    pub fn advance_and_pop(&mut self) -> KernelResult<Event<P>> {
        self.discard_cancelled();
        let Some(Entry(event)) = self.heap.pop() else {
            return Err(KernelError::QueueExhausted { now: self.now });
        };
        self.pending.remove(&event.seq);
        debug_assert!(event.due >= self.now, "clock must never decrease");
        self.now = event.due;
        Ok(event)
    }

    /// Move the clock forward to `tick` without popping anything.  Used by
    /// bounded runs to land exactly on their horizon.  Never moves backwards.
    pub fn advance_to(&mut self, tick: Tick) {
        if tick > self.now {
            self.now = tick;
        }
    }

    /// Number of live (non-cancelled) pending events.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn push(&mut self, due: Tick, payload: P) -> EventId {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry(Event { due, seq, payload }));
        self.pending.insert(seq);
        EventId(seq)
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.pending.contains(&top.0.seq) {
                break;
            }
            self.heap.pop();
        }
    }
}
