use std::collections::{BTreeMap, BTreeSet, VecDeque};

use dm_core::{ProcessId, Tick};

use crate::{KernelError, KernelResult, Scheduler, Ticket};

type Filter<T> = Box<dyn Fn(&T) -> bool>;

struct Getter<T> {
    ticket: Ticket,
    pid:    ProcessId,
    filter: Filter<T>,
}

/// A bounded multiset of typed items with predicate-matched retrieval.
///
/// Waiting `get`s are served in arrival order; each receives the first item
/// (in store order) its predicate accepts.  A `get` that matches nothing
/// does not block later `get`s that do.
///
/// Lifecycle of a retrieval:
///
/// ```text
/// get(filter) → Ticket ─(grant)→ take(ticket) → T ─(use)→ give_back(ticket, T)
/// ```
pub struct FilterStore<T> {
    name:     String,
    capacity: usize,
    items:    Vec<T>,
    getters:  VecDeque<Getter<T>>,
    /// Items matched to a getter but not yet taken.
    ready:    BTreeMap<Ticket, T>,
    /// Tickets whose item has been taken and not yet given back.
    out:      BTreeSet<Ticket>,
}

impl<T> FilterStore<T> {
    pub fn new(name: impl Into<String>, capacity: usize) -> KernelResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(KernelError::ZeroCapacity { resource: name });
        }
        Ok(Self {
            name,
            capacity,
            items:   Vec::new(),
            getters: VecDeque::new(),
            ready:   BTreeMap::new(),
            out:     BTreeSet::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items currently available, in store order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of `get`s still waiting for a match.
    pub fn waiting(&self) -> usize {
        self.getters.len()
    }

    /// Items held by processes (matched or taken).
    pub fn checked_out(&self) -> usize {
        self.ready.len() + self.out.len()
    }

    /// Add an item.  It immediately satisfies the longest-waiting compatible
    /// `get`, if any.
    pub fn put(&mut self, sched: &mut Scheduler, item: T) -> KernelResult<()> {
        if self.items.len() + self.checked_out() >= self.capacity {
            return Err(KernelError::StoreFull {
                resource: self.name.clone(),
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        self.trigger(sched)
    }

    /// Wait for an item accepted by `filter`.  The caller must `Yield::Wait`
    /// and then [`take`](Self::take) the item once granted.
    pub fn get<F>(&mut self, sched: &mut Scheduler, pid: ProcessId, filter: F) -> KernelResult<Ticket>
    where
        F: Fn(&T) -> bool + 'static,
    {
        let ticket = sched.next_ticket();
        self.getters.push_back(Getter { ticket, pid, filter: Box::new(filter) });
        self.trigger(sched)?;
        Ok(ticket)
    }

    /// Collect the item matched to a granted ticket.
    pub fn take(&mut self, ticket: Ticket, now: Tick) -> KernelResult<T> {
        let item = self.ready.remove(&ticket).ok_or_else(|| KernelError::ResourceMisuse {
            resource: self.name.clone(),
            ticket,
            now,
        })?;
        self.out.insert(ticket);
        Ok(item)
    }

    /// Return a taken item.  Fails with `ResourceMisuse` if `ticket` does not
    /// currently hold an item.
    pub fn give_back(&mut self, sched: &mut Scheduler, ticket: Ticket, item: T) -> KernelResult<()> {
        if !self.out.remove(&ticket) {
            return Err(KernelError::ResourceMisuse {
                resource: self.name.clone(),
                ticket,
                now: sched.now(),
            });
        }
        self.items.push(item);
        self.trigger(sched)
    }

    /// Withdraw a waiting `get`, or return an item that was matched but not
    /// yet taken.  Taken items must come back through `give_back`.
    pub fn cancel(&mut self, sched: &mut Scheduler, ticket: Ticket) -> KernelResult<bool> {
        if let Some(pos) = self.getters.iter().position(|g| g.ticket == ticket) {
            self.getters.remove(pos);
            return Ok(true);
        }
        if let Some(item) = self.ready.remove(&ticket) {
            sched.withdraw_grant(ticket);
            self.items.push(item);
            self.trigger(sched)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn trigger(&mut self, sched: &mut Scheduler) -> KernelResult<()> {
        let mut i = 0;
        while i < self.getters.len() {
            let matched = {
                let filter = &self.getters[i].filter;
                self.items.iter().position(|item| filter(item))
            };
            match matched {
                Some(pos) => {
                    let item = self.items.remove(pos);
                    let Some(getter) = self.getters.remove(i) else {
                        break;
                    };
                    self.ready.insert(getter.ticket, item);
                    sched.grant(getter.pid, getter.ticket)?;
                }
                None => i += 1,
            }
        }
        Ok(())
    }
}
