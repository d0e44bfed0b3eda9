//! The `Simulation` struct and its event loop.

use std::collections::BTreeMap;

use dm_core::{ProcessId, Tick};
use tracing::{debug, trace, warn};

use crate::queue::Event;
use crate::{Cause, Cx, KernelError, KernelResult, Process, Scheduler, Wakeup};

type Body<C> = Box<dyn Process<C>>;

/// A discrete-event simulation over shared context `C`.
///
/// `Simulation<C>` owns the [`Scheduler`], every live process body and the
/// model state.  Bodies are taken out of the registry while they run, so a
/// body never observes itself through `Cx`.
pub struct Simulation<C> {
    pub sched: Scheduler,
    bodies:    BTreeMap<ProcessId, Body<C>>,
    /// Model state shared by all processes.
    pub state: C,
}

impl<C> Simulation<C> {
    pub fn new(state: C) -> Self {
        Self {
            sched:  Scheduler::new(),
            bodies: BTreeMap::new(),
            state,
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.sched.now()
    }

    /// Launch a process from outside the event loop (model setup).
    pub fn spawn<P: Process<C> + 'static>(&mut self, body: P) -> KernelResult<ProcessId> {
        let pid = self.sched.register(body.label())?;
        self.bodies.insert(pid, Box::new(body));
        Ok(pid)
    }

    pub fn interrupt(&mut self, pid: ProcessId, cause: Cause) -> KernelResult<()> {
        self.sched.interrupt(pid, cause)
    }

    /// Pop and dispatch one event.  Returns `Ok(false)` once the queue is
    /// exhausted.
    pub fn step(&mut self) -> KernelResult<bool> {
        match self.sched.pop() {
            Ok(event) => {
                self.dispatch(event)?;
                Ok(true)
            }
            Err(KernelError::QueueExhausted { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run until no events remain.  Returns the time of the last event.
    ///
    /// Only terminates if every process eventually stops scheduling; models
    /// with perpetual background processes should use [`run_until`].
    ///
    /// [`run_until`]: Self::run_until
    pub fn run(&mut self) -> KernelResult<Tick> {
        while self.step()? {}
        Ok(self.now())
    }

    /// Dispatch every event due strictly before `horizon`, then move the
    /// clock to `horizon`.
    pub fn run_until(&mut self, horizon: Tick) -> KernelResult<()> {
        while let Some(due) = self.sched.peek_due() {
            if due >= horizon {
                break;
            }
            let event = self.sched.pop()?;
            self.dispatch(event)?;
        }
        self.sched.advance_to(horizon);
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────────────────

    fn dispatch(&mut self, event: Event<Wakeup>) -> KernelResult<()> {
        let fired = event.id();
        let Wakeup { pid, wake } = event.payload;
        let Some(mut body) = self.bodies.remove(&pid) else {
            trace!(%pid, ?wake, "dropping wake-up for finished process");
            return Ok(());
        };
        let Some(wake) = self.sched.begin_resume(pid, fired, wake) else {
            self.bodies.insert(pid, body);
            return Ok(());
        };
        trace!(%pid, label = body.label(), now = %self.now(), ?wake, "resume");

        let mut spawned = Vec::new();
        let result = {
            let mut cx = Cx::new(pid, &mut self.sched, &mut self.state, &mut spawned);
            body.resume(&mut cx, wake)
        };

        let outcome = match result {
            Ok(step) => self.sched.suspend(pid, step),
            Err(KernelError::UnhandledInterrupt { cause, .. }) => {
                debug!(%pid, ?cause, "terminated by unhandled interrupt");
                Ok(true)
            }
            Err(e) => Err(e),
        };

        let exit = match outcome {
            Ok(false) => {
                self.bodies.insert(pid, body);
                Ok(())
            }
            Ok(true) => self.finish(pid, &mut body, &mut spawned),
            Err(e) => {
                // Release on the error path too, then surface the failure.
                if let Err(exit_err) = self.finish(pid, &mut body, &mut spawned) {
                    warn!(%pid, error = %exit_err, "release failed while terminating on error");
                }
                Err(e)
            }
        };
        self.bodies.extend(spawned);
        exit
    }

    fn finish(
        &mut self,
        pid:     ProcessId,
        body:    &mut Body<C>,
        spawned: &mut Vec<(ProcessId, Body<C>)>,
    ) -> KernelResult<()> {
        let released = {
            let mut cx = Cx::new(pid, &mut self.sched, &mut self.state, spawned);
            body.on_exit(&mut cx)
        };
        self.sched.terminate(pid)?;
        released
    }
}
