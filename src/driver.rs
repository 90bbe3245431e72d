use crate::clock::Clock;
use crate::error::Result;
use crate::scheduler::Scheduler;
use crate::scoring::TrialRecord;
use crate::session::{Cell, SessionConfig};
use crate::trial::{Outcome, TrialEvent, TrialMachine, TrialState};

/// Runs a [`TrialMachine`] against a clock, turning its timer commands into scheduled events.
///
/// Front ends call [`TrialDriver::pump`] on every tick of their event loop and forward cell
/// selections through [`TrialDriver::select`]. Dropping the driver drops every timer with it.
#[derive(Debug)]
pub struct TrialDriver<C: Clock> {
    machine: TrialMachine,
    scheduler: Scheduler,
    clock: C,
}

impl<C: Clock> TrialDriver<C> {
    pub fn new(config: SessionConfig, clock: C) -> Self {
        Self {
            machine: TrialMachine::new(config),
            scheduler: Scheduler::new(),
            clock,
        }
    }

    pub fn start(&mut self) -> Result<Vec<Outcome>> {
        self.dispatch(TrialEvent::Start)
    }

    /// Fire every timer that has come due.
    pub fn pump(&mut self) -> Result<Vec<Outcome>> {
        let mut outcomes = Vec::new();
        while let Some(event) = self.scheduler.poll(self.clock.now_ms()) {
            outcomes.extend(self.dispatch(event)?);
        }
        Ok(outcomes)
    }

    pub fn select(&mut self, cell: Cell) -> Result<Vec<Outcome>> {
        self.dispatch(TrialEvent::Respond(cell))
    }

    pub fn abort(&mut self) -> Result<Vec<Outcome>> {
        self.dispatch(TrialEvent::Abort)
    }

    fn dispatch(&mut self, event: TrialEvent) -> Result<Vec<Outcome>> {
        let now = self.clock.now_ms();
        let transition = self.machine.handle(event, now)?;
        for command in transition.timers {
            self.scheduler.apply(command, now);
        }
        Ok(transition.outcomes)
    }

    pub fn state(&self) -> &TrialState {
        self.machine.state()
    }

    pub fn config(&self) -> &SessionConfig {
        self.machine.config()
    }

    pub fn records(&self) -> &[TrialRecord] {
        self.machine.records()
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.scheduler.is_idle()
    }
}
