//! `Scheduler` — process lifecycle bookkeeping and wake-up delivery.
//!
//! The scheduler owns the [`EventQueue`] and one entry per live process:
//! its [`ProcState`], the events currently able to wake it, and the
//! processes joined on it.  Process *bodies* live in
//! [`Simulation`][crate::Simulation]; keeping them apart lets a body be
//! resumed with `&mut Scheduler` in hand (resources schedule grants through
//! it) without aliasing the registry that owns the body.

use std::collections::BTreeMap;

use dm_core::{ProcessId, Tick};
use tracing::debug;

use crate::queue::{Event, EventId, EventQueue};
use crate::{Cause, Interrupt, KernelError, KernelResult, ProcState, Process, Ticket, WaitOn, Wake, Yield};

/// Event payload: which process to resume and why.
#[derive(Copy, Clone, Debug)]
pub struct Wakeup {
    pub pid:  ProcessId,
    pub wake: Wake,
}

struct Entry {
    label:   String,
    state:   ProcState,
    /// Timeout and join events that would resume this process.  Grants and
    /// interrupt deliveries are not tracked here.
    waits:   Vec<EventId>,
    joiners: Vec<ProcessId>,
}

/// A grant not yet delivered.  `event` is `None` while it is held back
/// because the holder was not waiting when it fired.
#[derive(Copy, Clone, Debug)]
struct Grant {
    pid:   ProcessId,
    event: Option<EventId>,
}

/// Process registry and wake-up router.
pub struct Scheduler {
    queue:       EventQueue<Wakeup>,
    procs:       BTreeMap<ProcessId, Entry>,
    grants:      BTreeMap<Ticket, Grant>,
    next_pid:    u32,
    next_ticket: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            queue:       EventQueue::new(),
            procs:       BTreeMap::new(),
            grants:      BTreeMap::new(),
            next_pid:    0,
            next_ticket: 0,
        }
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn now(&self) -> Tick {
        self.queue.now()
    }

    /// State of `pid`.  Finished (or never spawned) processes report
    /// `Terminated`.
    pub fn state(&self, pid: ProcessId) -> ProcState {
        self.procs.get(&pid).map_or(ProcState::Terminated, |e| e.state)
    }

    pub fn is_alive(&self, pid: ProcessId) -> bool {
        self.procs.contains_key(&pid)
    }

    pub fn label(&self, pid: ProcessId) -> Option<&str> {
        self.procs.get(&pid).map(|e| e.label.as_str())
    }

    /// Number of processes that have not terminated.
    pub fn live_processes(&self) -> usize {
        self.procs.len()
    }

    /// Number of pending events.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    // ── Services for resources and processes ──────────────────────────────

    /// Allocate the next resource ticket.  Tickets are globally increasing,
    /// so a ticket doubles as the request's arrival sequence number.
    pub fn next_ticket(&mut self) -> Ticket {
        let t = Ticket(self.next_ticket);
        self.next_ticket += 1;
        t
    }

    /// Resume `pid` at the current tick with `Wake::Granted(ticket)`.
    ///
    /// A grant survives interrupts.  If it fires while `pid` is sleeping or
    /// joined, it is held back and delivered at `pid`'s next `Yield::Wait`.
    pub fn grant(&mut self, pid: ProcessId, ticket: Ticket) -> KernelResult<()> {
        if !self.is_alive(pid) {
            return Err(KernelError::UnknownProcess { pid });
        }
        let ev = self.queue.schedule(0, Wakeup { pid, wake: Wake::Granted(ticket) })?;
        self.grants.insert(ticket, Grant { pid, event: Some(ev) });
        Ok(())
    }

    /// Drop an undelivered grant for `ticket`.  Resources call this when a
    /// ticket is released or cancelled before its holder saw the grant.
    pub fn withdraw_grant(&mut self, ticket: Ticket) -> bool {
        let Some(grant) = self.grants.remove(&ticket) else {
            return false;
        };
        if let Some(ev) = grant.event {
            self.queue.cancel(ev);
        }
        true
    }

    /// Deliver `cause` to `pid` at its next resumption point (this tick).
    ///
    /// A timeout or join `pid` is waiting on is unwound at delivery time; a
    /// timeout is reported back as [`Interrupt::remaining`].  Pending grants
    /// are kept.
    pub fn interrupt(&mut self, pid: ProcessId, cause: Cause) -> KernelResult<()> {
        if !self.is_alive(pid) {
            return Err(KernelError::UnknownProcess { pid });
        }
        let wake = Wake::Interrupted(Interrupt { cause, remaining: None });
        self.queue.schedule(0, Wakeup { pid, wake })?;
        Ok(())
    }

    /// Interrupt with [`Cause::Cancelled`].
    pub fn cancel(&mut self, pid: ProcessId) -> KernelResult<()> {
        self.interrupt(pid, Cause::Cancelled)
    }

    // ── Kernel-internal lifecycle ─────────────────────────────────────────

    pub(crate) fn register(&mut self, label: &str) -> KernelResult<ProcessId> {
        let pid = ProcessId(self.next_pid);
        self.next_pid += 1;
        let ev = self.queue.schedule(0, Wakeup { pid, wake: Wake::Start })?;
        self.procs.insert(pid, Entry {
            label:   label.to_owned(),
            state:   ProcState::Runnable,
            waits:   vec![ev],
            joiners: Vec::new(),
        });
        Ok(pid)
    }

    pub(crate) fn pop(&mut self) -> KernelResult<Event<Wakeup>> {
        self.queue.advance_and_pop()
    }

    pub(crate) fn peek_due(&mut self) -> Option<Tick> {
        self.queue.peek_due()
    }

    pub(crate) fn advance_to(&mut self, tick: Tick) {
        self.queue.advance_to(tick);
    }

    /// Mark `pid` runnable for the event `fired`.  For interrupts, unwind the
    /// current wait and fill in the unconsumed timeout.
    ///
    /// Returns `None` when a grant reaches a process that is not waiting on
    /// a resource; the grant is held back and `pid` is not resumed.
    pub(crate) fn begin_resume(&mut self, pid: ProcessId, fired: EventId, wake: Wake) -> Option<Wake> {
        let now = self.queue.now();
        let Some(entry) = self.procs.get_mut(&pid) else {
            return Some(wake);
        };
        let prior = entry.state;
        if let Wake::Granted(ticket) = wake {
            if matches!(prior, ProcState::Suspended(WaitOn::Timeout { .. } | WaitOn::Process(_))) {
                if let Some(grant) = self.grants.get_mut(&ticket) {
                    grant.event = None;
                }
                debug!(%pid, %ticket, %now, "grant held until the process waits");
                return None;
            }
            self.grants.remove(&ticket);
        }
        entry.waits.retain(|w| *w != fired);
        entry.state = ProcState::Runnable;

        let Wake::Interrupted(mut interrupt) = wake else {
            return Some(wake);
        };
        for ev in entry.waits.drain(..) {
            self.queue.cancel(ev);
        }
        match prior {
            ProcState::Suspended(WaitOn::Timeout { due }) => {
                interrupt.remaining = Some(due.since(now));
            }
            ProcState::Suspended(WaitOn::Process(target)) => {
                if let Some(t) = self.procs.get_mut(&target) {
                    t.joiners.retain(|j| *j != pid);
                }
            }
            _ => {}
        }
        Some(Wake::Interrupted(interrupt))
    }

    /// Record the suspension point returned by `resume`.  Returns `true` if
    /// the process asked to terminate.
    pub(crate) fn suspend(&mut self, pid: ProcessId, step: Yield) -> KernelResult<bool> {
        let now = self.queue.now();
        let state = match step {
            Yield::Done => return Ok(true),
            Yield::Timeout(delay) => {
                let ev = self
                    .queue
                    .schedule(delay, Wakeup { pid, wake: Wake::Timeout })
                    .map_err(|e| match e {
                        KernelError::InvalidDelay { delay, now, .. } => {
                            KernelError::InvalidDelay { pid: Some(pid), delay, now }
                        }
                        other => other,
                    })?;
                self.push_wait(pid, ev);
                ProcState::Suspended(WaitOn::Timeout { due: now + delay as u64 })
            }
            Yield::Wait => {
                self.redeliver_held_grant(pid)?;
                ProcState::Suspended(WaitOn::Resource)
            }
            Yield::Join(target) => {
                debug_assert!(target != pid, "a process cannot join itself");
                match self.procs.get_mut(&target) {
                    Some(t) => t.joiners.push(pid),
                    None => {
                        let ev = self.queue.schedule(0, Wakeup { pid, wake: Wake::Joined(target) })?;
                        self.push_wait(pid, ev);
                    }
                }
                ProcState::Suspended(WaitOn::Process(target))
            }
        };
        if let Some(entry) = self.procs.get_mut(&pid) {
            entry.state = state;
        }
        Ok(false)
    }

    /// Drop `pid` from the registry, cancel its outstanding wake-ups and
    /// resume everything joined on it.
    pub(crate) fn terminate(&mut self, pid: ProcessId) -> KernelResult<()> {
        let Some(entry) = self.procs.remove(&pid) else {
            return Ok(());
        };
        debug!(%pid, label = %entry.label, now = %self.now(), "process terminated");
        for ev in entry.waits {
            self.queue.cancel(ev);
        }
        let queue = &mut self.queue;
        self.grants.retain(|_, g| {
            if g.pid != pid {
                return true;
            }
            if let Some(ev) = g.event {
                queue.cancel(ev);
            }
            false
        });
        for joiner in entry.joiners {
            if self.is_alive(joiner) {
                let ev = self.queue.schedule(0, Wakeup { pid: joiner, wake: Wake::Joined(pid) })?;
                self.push_wait(joiner, ev);
            }
        }
        Ok(())
    }

    /// Reschedule the oldest held-back grant of `pid`, if any.
    fn redeliver_held_grant(&mut self, pid: ProcessId) -> KernelResult<()> {
        let held = self
            .grants
            .iter()
            .find(|(_, g)| g.pid == pid && g.event.is_none())
            .map(|(t, _)| *t);
        if let Some(ticket) = held {
            let ev = self.queue.schedule(0, Wakeup { pid, wake: Wake::Granted(ticket) })?;
            self.grants.insert(ticket, Grant { pid, event: Some(ev) });
        }
        Ok(())
    }

    fn push_wait(&mut self, pid: ProcessId, ev: EventId) {
        if let Some(entry) = self.procs.get_mut(&pid) {
            entry.waits.push(ev);
        }
    }
}

// ── Cx ────────────────────────────────────────────────────────────────────────

/// Everything a process body may touch while it runs.
///
/// `sched` and `state` are public fields so callers can borrow them
/// disjointly, e.g. `cx.state.bays.request(cx.sched, pid)`.
pub struct Cx<'a, C> {
    pid:         ProcessId,
    pub sched:   &'a mut Scheduler,
    pub state:   &'a mut C,
    spawned:     &'a mut Vec<(ProcessId, Box<dyn Process<C>>)>,
}

impl<'a, C> Cx<'a, C> {
    pub(crate) fn new(
        pid:     ProcessId,
        sched:   &'a mut Scheduler,
        state:   &'a mut C,
        spawned: &'a mut Vec<(ProcessId, Box<dyn Process<C>>)>,
    ) -> Self {
        Self { pid, sched, state, spawned }
    }

    /// The running process.
    #[inline]
    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.sched.now()
    }

    /// Launch a new process.  It is first resumed (with `Wake::Start`) at the
    /// current tick, after every event already scheduled for this tick.
    pub fn spawn<P: Process<C> + 'static>(&mut self, body: P) -> KernelResult<ProcessId> {
        let pid = self.sched.register(body.label())?;
        self.spawned.push((pid, Box::new(body)));
        Ok(pid)
    }

    pub fn interrupt(&mut self, pid: ProcessId, cause: Cause) -> KernelResult<()> {
        self.sched.interrupt(pid, cause)
    }

    pub fn is_alive(&self, pid: ProcessId) -> bool {
        self.sched.is_alive(pid)
    }
}
