use crate::clock::Millis;
use crate::trial::{TimerCommand, TrialEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Periodic {
    next_due: Millis,
    period: Millis,
}

/// Cancellable timers for a single session: at most one periodic countdown and one pending
/// inter-trial delay. Nothing fires on its own; the owner polls with the current time.
#[derive(Debug, Default)]
pub struct Scheduler {
    countdown: Option<Periodic>,
    next_trial: Option<Millis>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, command: TimerCommand, now: Millis) {
        match command {
            TimerCommand::StartCountdown { period } => {
                let period = period.as_millis() as Millis;
                self.countdown = Some(Periodic {
                    next_due: now + period,
                    period,
                });
            }
            TimerCommand::StopCountdown => self.countdown = None,
            TimerCommand::ScheduleNextTrial { delay } => {
                self.next_trial = Some(now + delay.as_millis() as Millis);
            }
            TimerCommand::CancelAll => self.cancel_all(),
        }
    }

    /// Take the earliest timer that is due at `now`, if any.
    pub fn poll(&mut self, now: Millis) -> Option<TrialEvent> {
        let countdown_due = self.countdown.map(|c| c.next_due).filter(|due| *due <= now);
        let next_trial_due = self.next_trial.filter(|due| *due <= now);

        match (countdown_due, next_trial_due) {
            (Some(c), Some(n)) if n < c => self.fire_next_trial(),
            (Some(_), _) => {
                if let Some(countdown) = self.countdown.as_mut() {
                    countdown.next_due += countdown.period;
                }
                Some(TrialEvent::CountdownTick)
            }
            (None, Some(_)) => self.fire_next_trial(),
            (None, None) => None,
        }
    }

    fn fire_next_trial(&mut self) -> Option<TrialEvent> {
        self.next_trial = None;
        Some(TrialEvent::DelayElapsed)
    }

    pub fn cancel_all(&mut self) {
        self.countdown = None;
        self.next_trial = None;
    }

    pub fn is_idle(&self) -> bool {
        self.countdown.is_none() && self.next_trial.is_none()
    }
}
