use std::collections::VecDeque;

use dm_core::ProcessId;

use crate::{KernelError, KernelResult, Scheduler, Ticket};

#[derive(Copy, Clone, Debug)]
struct Claim {
    ticket: Ticket,
    pid:    ProcessId,
}

/// Mutual-exclusion pool of `capacity` identical slots, granted in arrival
/// order.
pub struct Resource {
    name:     String,
    capacity: usize,
    users:    Vec<Claim>,
    queue:    VecDeque<Claim>,
}

impl Resource {
    pub fn new(name: impl Into<String>, capacity: usize) -> KernelResult<Self> {
        let name = name.into();
        if capacity == 0 {
            return Err(KernelError::ZeroCapacity { resource: name });
        }
        Ok(Self { name, capacity, users: Vec::new(), queue: VecDeque::new() })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    pub fn count(&self) -> usize {
        self.users.len()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_holding(&self, ticket: Ticket) -> bool {
        self.users.iter().any(|c| c.ticket == ticket)
    }

    /// Processes currently holding a slot, in grant order.
    pub fn holders(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.users.iter().map(|c| c.pid)
    }

    /// Enqueue a request for `pid`.  The caller must `Yield::Wait`.
    pub fn request(&mut self, sched: &mut Scheduler, pid: ProcessId) -> KernelResult<Ticket> {
        let ticket = sched.next_ticket();
        self.queue.push_back(Claim { ticket, pid });
        self.trigger(sched)?;
        Ok(ticket)
    }

    /// Release a held slot.
    pub fn release(&mut self, sched: &mut Scheduler, ticket: Ticket) -> KernelResult<()> {
        let Some(pos) = self.users.iter().position(|c| c.ticket == ticket) else {
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

    /// Withdraw a queued request or release a held slot.  Returns `false` if
    /// the ticket is unknown (already released or withdrawn).
    pub fn cancel(&mut self, sched: &mut Scheduler, ticket: Ticket) -> KernelResult<bool> {
        if let Some(pos) = self.queue.iter().position(|c| c.ticket == ticket) {
            self.queue.remove(pos);
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
            let Some(claim) = self.queue.pop_front() else {
                break;
            };
            self.users.push(claim);
            sched.grant(claim.pid, claim.ticket)?;
        }
        debug_assert!(self.users.len() <= self.capacity);
        Ok(())
    }
}
