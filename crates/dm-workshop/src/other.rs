//! Background work for the repair crew.

use dm_kernel::{Cause, Cx, KernelResult, Process, Ticket, Wake, Yield};

use crate::state::OTHER_JOB_PRIORITY;
use crate::WorkshopState;

/// Runs low-priority jobs back to back on one repairer.  When a repair
/// evicts it, it queues again and carries on with the remaining work.
pub(crate) struct OtherJobs {
    ticket:  Option<Ticket>,
    done_in: u64,
}

impl OtherJobs {
    pub(crate) fn new() -> Self {
        Self { ticket: None, done_in: 0 }
    }

    fn queue(&mut self, cx: &mut Cx<'_, WorkshopState>) -> KernelResult<Yield> {
        let pid = cx.pid();
        self.ticket = Some(cx.state.repairers.request(cx.sched, pid, OTHER_JOB_PRIORITY)?);
        Ok(Yield::Wait)
    }

    fn new_job(&mut self, cx: &mut Cx<'_, WorkshopState>) -> KernelResult<Yield> {
        self.done_in = cx.state.config.other_job_ticks;
        self.queue(cx)
    }
}

impl Process<WorkshopState> for OtherJobs {
    fn label(&self) -> &str {
        "other jobs"
    }

    fn resume(&mut self, cx: &mut Cx<'_, WorkshopState>, wake: Wake) -> KernelResult<Yield> {
        match wake {
            Wake::Start => self.new_job(cx),
            Wake::Granted(t) if Some(t) == self.ticket => Ok(Yield::after(self.done_in)),
            Wake::Timeout => {
                if let Some(t) = self.ticket.take() {
                    cx.state.repairers.release(cx.sched, t)?;
                }
                cx.state.other_jobs_done += 1;
                self.new_job(cx)
            }
            Wake::Interrupted(i) if matches!(i.cause, Cause::Preempted { .. }) => {
                // The evicted ticket is no longer held.
                self.ticket = None;
                cx.state.other_jobs_preempted += 1;
                self.done_in = i.remaining_work();
                if self.done_in == 0 {
                    cx.state.other_jobs_done += 1;
                    return self.new_job(cx);
                }
                self.queue(cx)
            }
            other => {
                other.unhandled(cx.pid())?;
                Ok(Yield::Wait)
            }
        }
    }

    fn on_exit(&mut self, cx: &mut Cx<'_, WorkshopState>) -> KernelResult<()> {
        if let Some(t) = self.ticket.take() {
            cx.state.repairers.cancel(cx.sched, t)?;
        }
        Ok(())
    }
}
