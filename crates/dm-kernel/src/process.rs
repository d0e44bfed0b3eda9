//! The `Process` trait — suspendable units of work as explicit state machines.
//!
//! A process is a small state enum plus a `resume` entry point.  Each call
//! to `resume` runs the process from one suspension point to the next and
//! returns a [`Yield`] naming what it now waits for.  The scheduler calls
//! `resume` again, with a [`Wake`] saying why, once that wait completes.
//!
//! # Interrupts
//!
//! [`Scheduler::interrupt`][crate::Scheduler::interrupt] unwinds whatever the
//! target is waiting on and resumes it with [`Wake::Interrupted`].  A process
//! either branches on the interrupt, or returns
//! [`KernelError::UnhandledInterrupt`] (see [`Wake::unhandled`]), which
//! terminates it without failing the run.
//!
//! # Guaranteed release
//!
//! [`Process::on_exit`] runs on every termination path (`Yield::Done`, an
//! unhandled interrupt, or an error), so a process that holds resource
//! tickets releases them there.

use dm_core::{ProcessId, Tick};

use crate::{Cx, KernelError, KernelResult, Ticket};

// ── Interrupts ────────────────────────────────────────────────────────────────

/// Why a process was interrupted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cause {
    /// A higher-priority request evicted this process from a preemptive
    /// resource.  `ticket` is the evicted claim (no longer held).
    Preempted {
        by:           ProcessId,
        ticket:       Ticket,
        usage_since:  Tick,
    },
    /// Cooperative cancellation: release everything and terminate.
    Cancelled,
    /// Model-defined interrupt (e.g. a machine breakdown).
    Signal(u32),
}

/// An interrupt as delivered to the target process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Interrupt {
    pub cause:     Cause,
    /// Unconsumed part of the timeout the target was sleeping on when the
    /// interrupt unwound it, or `None` if it was not in a timeout.
    pub remaining: Option<u64>,
}

impl Interrupt {
    /// Remaining work for a preempted or interrupted timeout (0 if the
    /// process was not sleeping on one).
    pub fn remaining_work(&self) -> u64 {
        self.remaining.unwrap_or(0)
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self.cause, Cause::Cancelled)
    }
}

// ── Wake / Yield ──────────────────────────────────────────────────────────────

/// The reason a process is being resumed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Wake {
    /// First resumption after `spawn`.
    Start,
    /// A `Yield::Timeout` elapsed.
    Timeout,
    /// A resource granted the request identified by this ticket.
    Granted(Ticket),
    /// The process waited on with `Yield::Join` terminated.
    Joined(ProcessId),
    /// The current wait was unwound by an interrupt.
    Interrupted(Interrupt),
}

impl Wake {
    /// Convert an interrupt the process does not handle into the error that
    /// terminates it.  Any other wake passes through unchanged.
    pub fn unhandled(self, pid: ProcessId) -> KernelResult<Wake> {
        match self {
            Wake::Interrupted(i) => Err(KernelError::UnhandledInterrupt { pid, cause: i.cause }),
            other => Ok(other),
        }
    }
}

/// A suspension point returned from [`Process::resume`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Yield {
    /// Sleep for this many ticks.  Negative values fail with `InvalidDelay`.
    Timeout(i64),
    /// Sleep until a resource requested during this resume grants a ticket.
    Wait,
    /// Sleep until the given process terminates.
    Join(ProcessId),
    /// Terminate.
    Done,
}

impl Yield {
    /// `Yield::Timeout` for an unsigned tick count.
    #[inline]
    pub fn after(ticks: u64) -> Yield {
        Yield::Timeout(ticks as i64)
    }
}

// ── Process state ─────────────────────────────────────────────────────────────

/// What a suspended process is waiting on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WaitOn {
    Timeout { due: Tick },
    Resource,
    Process(ProcessId),
}

/// Lifecycle state of a process as tracked by the scheduler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcState {
    Runnable,
    Suspended(WaitOn),
    Terminated,
}

// ── Process trait ─────────────────────────────────────────────────────────────

/// A suspendable unit of work running on the kernel with shared context `C`.
///
/// # Example — a periodic ticker
///
/// ```rust
/// use dm_kernel::{Cx, KernelResult, Process, Simulation, Wake, Yield};
///
/// struct Ticker { fired: u32 }
///
/// impl Process<Vec<u64>> for Ticker {
///     fn resume(&mut self, cx: &mut Cx<'_, Vec<u64>>, wake: Wake) -> KernelResult<Yield> {
///         wake.unhandled(cx.pid())?;
///         cx.state.push(cx.now().0);
///         self.fired += 1;
///         Ok(if self.fired < 3 { Yield::after(5) } else { Yield::Done })
///     }
/// }
///
/// let mut sim = Simulation::new(Vec::new());
/// sim.spawn(Ticker { fired: 0 }).unwrap();
/// sim.run().unwrap();
/// assert_eq!(sim.state, vec![0, 5, 10]);
/// ```
pub trait Process<C> {
    /// Short label used in logs.
    fn label(&self) -> &str {
        "process"
    }

    /// Run until the next suspension point.
    fn resume(&mut self, cx: &mut Cx<'_, C>, wake: Wake) -> KernelResult<Yield>;

    /// Release anything still held.  Called exactly once, on every
    /// termination path.
    fn on_exit(&mut self, _cx: &mut Cx<'_, C>) -> KernelResult<()> {
        Ok(())
    }
}
