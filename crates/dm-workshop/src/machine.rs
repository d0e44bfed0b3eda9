//! A machine: a production process plus a breakdown process aimed at it.

use dm_core::{MachineId, ProcessId, Tick};
use dm_kernel::{Cause, Cx, KernelResult, Process, Ticket, Wake, Yield};
use tracing::debug;

use crate::state::REPAIR_PRIORITY;
use crate::WorkshopState;

/// Interrupt code sent by [`Breakdown`].
pub const BREAKDOWN: u32 = 1;

type WorkshopCx<'a> = Cx<'a, WorkshopState>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Step {
    Working,
    AwaitingRepairer { ticket: Ticket, broke_at: Tick },
    Repairing { ticket: Ticket, broke_at: Tick },
}

/// Makes parts back to back.  A breakdown suspends the current part until a
/// repairer has fixed the machine; the part then resumes with the work that
/// was left.
pub(crate) struct Machine {
    id:      MachineId,
    step:    Step,
    /// Ticks still needed for the part in hand.
    done_in: u64,
}

impl Machine {
    pub(crate) fn new(id: MachineId) -> Self {
        Self { id, step: Step::Working, done_in: 0 }
    }

    fn next_part(&mut self, cx: &mut WorkshopCx<'_>) -> Yield {
        self.done_in = cx.state.config.part_ticks;
        self.step = Step::Working;
        Yield::after(self.done_in)
    }

    fn part_done(&mut self, cx: &mut WorkshopCx<'_>) -> Yield {
        let part = cx.state.config.part_ticks;
        let stats = &mut cx.state.machines[self.id.index()];
        stats.uptime += part;
        stats.parts += 1;
        self.next_part(cx)
    }

    fn broken(&mut self, cx: &mut WorkshopCx<'_>, remaining: u64) -> KernelResult<Yield> {
        let now = cx.now();
        let pid = cx.pid();
        let stats = &mut cx.state.machines[self.id.index()];
        stats.broken = true;
        stats.breakdowns += 1;
        self.done_in = remaining;
        debug!(machine = %self.id, %now, remaining, "machine broke down");
        let ticket = cx.state.repairers.request(cx.sched, pid, REPAIR_PRIORITY)?;
        self.step = Step::AwaitingRepairer { ticket, broke_at: now };
        Ok(Yield::Wait)
    }

    fn repaired(&mut self, cx: &mut WorkshopCx<'_>, ticket: Ticket, broke_at: Tick) -> KernelResult<Yield> {
        let now = cx.now();
        cx.state.repairers.release(cx.sched, ticket)?;
        let stats = &mut cx.state.machines[self.id.index()];
        stats.downtime += now.since(broke_at);
        stats.broken = false;
        self.step = Step::Working;
        if self.done_in == 0 {
            return Ok(self.part_done(cx));
        }
        Ok(Yield::after(self.done_in))
    }
}

impl Process<WorkshopState> for Machine {
    fn label(&self) -> &str {
        "machine"
    }

    fn resume(&mut self, cx: &mut WorkshopCx<'_>, wake: Wake) -> KernelResult<Yield> {
        match (self.step, wake) {
            (Step::Working, Wake::Start) => Ok(self.next_part(cx)),
            (Step::Working, Wake::Timeout) => Ok(self.part_done(cx)),
            (Step::Working, Wake::Interrupted(i)) if i.cause == Cause::Signal(BREAKDOWN) => {
                self.broken(cx, i.remaining_work())
            }
            (Step::AwaitingRepairer { ticket, broke_at }, Wake::Granted(g)) if g == ticket => {
                let repair = cx.state.repair_time(self.id);
                self.step = Step::Repairing { ticket, broke_at };
                Ok(Yield::after(repair))
            }
            (Step::Repairing { ticket, broke_at }, Wake::Timeout) => self.repaired(cx, ticket, broke_at),
            (_, wake) => {
                wake.unhandled(cx.pid())?;
                Ok(Yield::Wait)
            }
        }
    }

    fn on_exit(&mut self, cx: &mut WorkshopCx<'_>) -> KernelResult<()> {
        if let Step::AwaitingRepairer { ticket, .. } | Step::Repairing { ticket, .. } = self.step {
            cx.state.repairers.cancel(cx.sched, ticket)?;
        }
        Ok(())
    }
}

/// Breaks `target` after exponential times to failure, skipping failures
/// that fall while it is already broken.
pub(crate) struct Breakdown {
    machine: MachineId,
    target:  ProcessId,
}

impl Breakdown {
    pub(crate) fn new(machine: MachineId, target: ProcessId) -> Self {
        Self { machine, target }
    }
}

impl Process<WorkshopState> for Breakdown {
    fn label(&self) -> &str {
        "breakdown"
    }

    fn resume(&mut self, cx: &mut WorkshopCx<'_>, wake: Wake) -> KernelResult<Yield> {
        if wake.unhandled(cx.pid())? == Wake::Timeout && !cx.state.machine(self.machine).broken {
            cx.interrupt(self.target, Cause::Signal(BREAKDOWN))?;
        }
        Ok(Yield::after(cx.state.time_to_failure(self.machine)))
    }
}
