use std::collections::BTreeMap;

use dm_core::{ProcessId, Tick};
use tracing::debug;

use crate::{Cause, KernelError, KernelResult, Scheduler, Ticket};

#[derive(Copy, Clone, Debug)]
struct Holder {
    priority: i32,
    ticket:   Ticket,
    pid:      ProcessId,
    since:    Tick,
}

impl Holder {
    /// Sort key: larger means "evicted first" (lower priority, later arrival).
    fn key(&self) -> (i32, Ticket) {
        (self.priority, self.ticket)
    }
}

/// Pool of `capacity` slots granted in `(priority, arrival)` order.  Lower
/// numeric priority wins; ties go to the earlier request.
pub struct PriorityResource {
    name:     String,
    capacity: usize,
    users:    Vec<Holder>,
    queue:    BTreeMap<(i32, Ticket), ProcessId>,
}

impl PriorityResource {
    pub fn new(name: impl Into<String>, capacity: usize) -> KernelResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(KernelError::ZeroCapacity { resource: name });
        }
        Ok(Self { name, capacity, users: Vec::new(), queue: BTreeMap::new() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self) -> usize {
        self.users.len()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_holding(&self, ticket: Ticket) -> bool {
        self.users.iter().any(|h| h.ticket == ticket)
    }

    /// `(pid, priority)` of every current holder, in grant order.
    pub fn holders(&self) -> impl Iterator<Item = (ProcessId, i32)> + '_ {
        self.users.iter().map(|h| (h.pid, h.priority))
    }

    pub fn request(
        &mut self,
        sched:    &mut Scheduler,
        pid:      ProcessId,
        priority: i32,
    ) -> KernelResult<Ticket> {
        let ticket = sched.next_ticket();
        self.queue.insert((priority, ticket), pid);
        self.trigger(sched)?;
        Ok(ticket)
    }

    pub fn release(&mut self, sched: &mut Scheduler, ticket: Ticket) -> KernelResult<()> {
        let Some(pos) = self.users.iter().position(|h| h.ticket == ticket) else {
            return Err(KernelError::ResourceMisuse {
                resource: self.name.clone(),
                ticket,
                now: sched.now(),
            });
        };
        self.users.remove(pos);
        sched.withdraw_grant(ticket);
        self.trigger(sched)
    }

    /// Withdraw a queued request or release a held slot.
    pub fn cancel(&mut self, sched: &mut Scheduler, ticket: Ticket) -> KernelResult<bool> {
        if let Some(key) = self.queue.keys().find(|(_, t)| *t == ticket).copied() {
            self.queue.remove(&key);
            return Ok(true);
        }
        if self.is_holding(ticket) {
            self.release(sched, ticket)?;
            return Ok(true);
        }
        Ok(false)
    }

    fn trigger(&mut self, sched: &mut Scheduler) -> KernelResult<()> {
        while self.users.len() < self.capacity {
            let Some(((priority, ticket), pid)) = self.queue.pop_first() else {
                break;
            };
            self.users.push(Holder { priority, ticket, pid, since: sched.now() });
            sched.grant(pid, ticket)?;
        }
        debug_assert!(self.users.len() <= self.capacity);
        Ok(())
    }

    /// Index of the holder that would be evicted first.
    fn eviction_candidate(&self) -> Option<usize> {
        self.users
            .iter()
            .enumerate()
            .max_by_key(|(_, h)| h.key())
            .map(|(i, _)| i)
    }
}

/// A [`PriorityResource`] whose full-capacity requests may evict a holder.
///
/// When every slot is held and a request arrives whose priority is strictly
/// better than the worst holder's, exactly that one holder is removed and
/// interrupted with [`Cause::Preempted`]; the delivered interrupt carries
/// the holder's unconsumed timeout in `remaining`.  The evicted holder must
/// request again to resume its remaining work.
pub struct PreemptiveResource {
    inner:       PriorityResource,
    preemptions: u64,
}

impl PreemptiveResource {
    pub fn new(name: impl Into<String>, capacity: usize) -> KernelResult<Self> {
        Ok(Self { inner: PriorityResource::new(name, capacity)?, preemptions: 0 })
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    pub fn count(&self) -> usize {
        self.inner.count()
    }

    pub fn queue_len(&self) -> usize {
        self.inner.queue_len()
    }

    pub fn is_holding(&self, ticket: Ticket) -> bool {
        self.inner.is_holding(ticket)
    }

    pub fn holders(&self) -> impl Iterator<Item = (ProcessId, i32)> + '_ {
        self.inner.holders()
    }

    /// Total evictions so far.
    pub fn preemptions(&self) -> u64 {
        self.preemptions
    }

    pub fn request(
        &mut self,
        sched:    &mut Scheduler,
        pid:      ProcessId,
        priority: i32,
    ) -> KernelResult<Ticket> {
        if self.inner.users.len() >= self.inner.capacity {
            self.preempt_for(sched, pid, priority)?;
        }
        self.inner.request(sched, pid, priority)
    }

    pub fn release(&mut self, sched: &mut Scheduler, ticket: Ticket) -> KernelResult<()> {
        self.inner.release(sched, ticket)
    }

    pub fn cancel(&mut self, sched: &mut Scheduler, ticket: Ticket) -> KernelResult<bool> {
        self.inner.cancel(sched, ticket)
    }

    fn preempt_for(
        &mut self,
        sched:    &mut Scheduler,
        by:       ProcessId,
        priority: i32,
    ) -> KernelResult<()> {
        let Some(idx) = self.inner.eviction_candidate() else {
            return Ok(());
        };
        if priority >= self.inner.users[idx].priority {
            return Ok(());
        }
        let victim = self.inner.users.remove(idx);
        self.preemptions += 1;
        debug!(
            resource = %self.inner.name,
            victim = %victim.pid,
            %by,
            now = %sched.now(),
            "preempting holder"
        );
        sched.interrupt(victim.pid, Cause::Preempted {
            by,
            ticket:      victim.ticket,
            usage_since: victim.since,
        })
    }
}
