//! The countdown / reveal / respond cycle.
//!
//! [`TrialMachine::handle`] is a pure transition over an explicit [`TrialState`]: it takes an
//! event and the current time and returns the timer changes the caller must make plus any
//! outcomes. It never reads a clock or sleeps, so every path is testable with plain numbers.

use std::time::Duration;

use crate::clock::Millis;
use crate::error::Result;
use crate::scoring::{Scorer, SessionSummary, TrialRecord};
use crate::sequence::TrialOrder;
use crate::session::{Cell, Mode, SessionConfig};

pub const COUNTDOWN_TICKS: u8 = 3;
pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);
pub const INTER_TRIAL_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CountingDown,
    AwaitingResponse,
    /// Timed session completed every trial.
    Terminated,
    /// Session was ended from outside; nothing is exported.
    Aborted,
}

impl Phase {
    pub fn is_over(self) -> bool {
        matches!(self, Phase::Terminated | Phase::Aborted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialState {
    pub current_index: usize,
    pub phase: Phase,
    pub countdown_remaining: Option<u8>,
    /// Revealed target; only this one is scored.
    pub current_target: Option<Cell>,
    /// Upcoming target shown in the pending style during the countdown.
    pub preview_target: Option<Cell>,
    pub response_started_at: Option<Millis>,
}

impl Default for TrialState {
    fn default() -> Self {
        Self {
            current_index: 0,
            phase: Phase::Idle,
            countdown_remaining: None,
            current_target: None,
            preview_target: None,
            response_started_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialEvent {
    Start,
    CountdownTick,
    Respond(Cell),
    DelayElapsed,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    StartCountdown { period: Duration },
    StopCountdown,
    ScheduleNextTrial { delay: Duration },
    CancelAll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub participant_id: u32,
    pub mode: Mode,
    pub records: Vec<TrialRecord>,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Recorded(TrialRecord),
    Finished(SessionReport),
    Aborted,
}

/// What the caller has to do after an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    pub timers: Vec<TimerCommand>,
    pub outcomes: Vec<Outcome>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.timers.is_empty() && self.outcomes.is_empty()
    }
}

#[derive(Debug)]
pub struct TrialMachine {
    config: SessionConfig,
    order: TrialOrder,
    state: TrialState,
    scorer: Scorer,
    started: bool,
    next_trial_pending: bool,
}

impl TrialMachine {
    pub fn new(config: SessionConfig) -> Self {
        let order = TrialOrder::for_session(&config);
        Self {
            scorer: Scorer::new(config.grid()),
            config,
            order,
            state: TrialState::default(),
            started: false,
            next_trial_pending: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn order(&self) -> &TrialOrder {
        &self.order
    }

    pub fn state(&self) -> &TrialState {
        &self.state
    }

    pub fn records(&self) -> &[TrialRecord] {
        self.scorer.records()
    }

    pub fn handle(&mut self, event: TrialEvent, now: Millis) -> Result<Transition> {
        if let TrialEvent::Respond(cell) = event {
            self.config.grid().check(cell)?;
        }
        if self.state.phase.is_over() {
            return Ok(Transition::none());
        }

        let transition = match event {
            TrialEvent::Start if !self.started => {
                self.started = true;
                self.begin_countdown()
            }
            TrialEvent::DelayElapsed if self.next_trial_pending => {
                self.next_trial_pending = false;
                self.begin_countdown()
            }
            TrialEvent::CountdownTick if self.state.phase == Phase::CountingDown => {
                self.tick(now)
            }
            TrialEvent::Respond(cell) => self.respond(cell, now)?,
            TrialEvent::Abort => self.abort(),
            _ => Transition::none(),
        };
        Ok(transition)
    }

    fn begin_countdown(&mut self) -> Transition {
        let preview = self.order[self.state.current_index];
        self.state.phase = Phase::CountingDown;
        self.state.countdown_remaining = Some(COUNTDOWN_TICKS);
        self.state.preview_target = Some(preview);
        self.state.current_target = None;
        tracing::debug!(index = self.state.current_index, preview, "countdown started");

        Transition {
            timers: vec![TimerCommand::StartCountdown {
                period: COUNTDOWN_PERIOD,
            }],
            outcomes: vec![],
        }
    }

    fn tick(&mut self, now: Millis) -> Transition {
        let remaining = self.state.countdown_remaining.unwrap_or(1).saturating_sub(1);
        if remaining > 0 {
            self.state.countdown_remaining = Some(remaining);
            return Transition::none();
        }

        let target = self.order[self.state.current_index];
        self.state.countdown_remaining = None;
        self.state.preview_target = None;
        self.state.current_target = Some(target);
        self.state.response_started_at = Some(now);
        self.state.phase = Phase::AwaitingResponse;
        tracing::debug!(index = self.state.current_index, target, "target revealed");

        Transition {
            timers: vec![TimerCommand::StopCountdown],
            outcomes: vec![],
        }
    }

    fn respond(&mut self, cell: Cell, now: Millis) -> Result<Transition> {
        let (Some(target), Some(started_at)) =
            (self.state.current_target, self.state.response_started_at)
        else {
            return Ok(Transition::none());
        };

        let record = self.scorer.record(
            self.state.current_index as u32 + 1,
            now.saturating_sub(started_at),
            target,
            cell,
        );
        self.state.current_target = None;
        self.state.response_started_at = None;
        self.state.phase = Phase::Idle;
        tracing::info!(
            sequence = record.sequence_number,
            response_time_ms = record.response_time_ms,
            target,
            responded = cell,
            "response recorded"
        );

        let next_index = self.state.current_index + 1;
        let mut outcomes = vec![Outcome::Recorded(record)];

        if self.config.mode().is_practice() {
            self.state.current_index = next_index % self.order.len();
        } else if next_index >= self.config.total_cells() as usize {
            self.state.phase = Phase::Terminated;
            let summary = self.scorer.summarize()?;
            tracing::info!(
                records = self.scorer.records().len(),
                average_response_time_ms = summary.average_response_time_ms,
                accuracy = summary.accuracy_rate_percent,
                "session finished"
            );
            outcomes.push(Outcome::Finished(SessionReport {
                participant_id: self.config.participant_id(),
                mode: self.config.mode(),
                records: self.scorer.records().to_vec(),
                summary,
            }));
            return Ok(Transition {
                timers: vec![],
                outcomes,
            });
        } else {
            self.state.current_index = next_index;
        }

        self.next_trial_pending = true;
        Ok(Transition {
            timers: vec![TimerCommand::ScheduleNextTrial {
                delay: INTER_TRIAL_DELAY,
            }],
            outcomes,
        })
    }

    fn abort(&mut self) -> Transition {
        tracing::info!(
            mode = %self.config.mode(),
            index = self.state.current_index,
            "session aborted"
        );
        self.state = TrialState {
            current_index: self.state.current_index,
            phase: Phase::Aborted,
            ..TrialState::default()
        };
        self.next_trial_pending = false;

        Transition {
            timers: vec![TimerCommand::CancelAll],
            outcomes: vec![Outcome::Aborted],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::session::Grid;
    use assert_matches::assert_matches;

    fn machine(mode: Mode) -> TrialMachine {
        TrialMachine::new(SessionConfig::new(1, mode, Grid::default()).unwrap())
    }

    /// Run the countdown to the reveal, starting at `now`.
    fn reveal(m: &mut TrialMachine, now: Millis) {
        for i in 1..=COUNTDOWN_TICKS as u64 {
            m.handle(TrialEvent::CountdownTick, now + i * 1000).unwrap();
        }
        assert_eq!(m.state().phase, Phase::AwaitingResponse);
    }

    #[test]
    fn start_enters_countdown_with_preview() {
        let mut m = machine(Mode::Existing);
        let t = m.handle(TrialEvent::Start, 0).unwrap();

        assert_eq!(
            t.timers,
            vec![TimerCommand::StartCountdown {
                period: COUNTDOWN_PERIOD
            }]
        );
        let state = m.state();
        assert_eq!(state.phase, Phase::CountingDown);
        assert_eq!(state.countdown_remaining, Some(3));
        assert_eq!(state.preview_target, Some(m.order()[0]));
        assert_eq!(state.current_target, None);
    }

    #[test]
    fn start_twice_is_a_noop() {
        let mut m = machine(Mode::Existing);
        m.handle(TrialEvent::Start, 0).unwrap();
        assert!(m.handle(TrialEvent::Start, 10).unwrap().is_noop());
    }

    #[test]
    fn countdown_reveals_after_three_ticks() {
        let mut m = machine(Mode::Existing);
        m.handle(TrialEvent::Start, 0).unwrap();

        assert!(m.handle(TrialEvent::CountdownTick, 1000).unwrap().is_noop());
        assert_eq!(m.state().countdown_remaining, Some(2));
        m.handle(TrialEvent::CountdownTick, 2000).unwrap();
        assert_eq!(m.state().countdown_remaining, Some(1));

        let t = m.handle(TrialEvent::CountdownTick, 3000).unwrap();
        assert_eq!(t.timers, vec![TimerCommand::StopCountdown]);
        let state = m.state();
        assert_eq!(state.phase, Phase::AwaitingResponse);
        assert_eq!(state.countdown_remaining, None);
        assert_eq!(state.preview_target, None);
        assert_eq!(state.current_target, Some(m.order()[0]));
        assert_eq!(state.response_started_at, Some(3000));
    }

    #[test]
    fn response_during_countdown_is_ignored() {
        let mut m = machine(Mode::Existing);
        m.handle(TrialEvent::Start, 0).unwrap();
        let before = m.state().clone();

        let t = m.handle(TrialEvent::Respond(5), 500).unwrap();
        assert!(t.is_noop());
        assert_eq!(m.state(), &before);
        assert!(m.records().is_empty());
    }

    #[test]
    fn response_before_start_is_ignored() {
        let mut m = machine(Mode::Practice);
        assert!(m.handle(TrialEvent::Respond(1), 0).unwrap().is_noop());
        assert_eq!(m.state(), &TrialState::default());
    }

    #[test]
    fn out_of_range_response_is_an_error() {
        let mut m = machine(Mode::Existing);
        m.handle(TrialEvent::Start, 0).unwrap();
        assert_matches!(
            m.handle(TrialEvent::Respond(36), 10),
            Err(Error::CellOutOfRange { cell: 36, total: 35 })
        );
        assert_matches!(
            m.handle(TrialEvent::Respond(0), 10),
            Err(Error::CellOutOfRange { cell: 0, .. })
        );
    }

    #[test]
    fn accepted_response_is_scored_once() {
        let mut m = machine(Mode::Existing);
        m.handle(TrialEvent::Start, 0).unwrap();
        reveal(&mut m, 0);
        let target = m.order()[0];

        let t = m.handle(TrialEvent::Respond(target), 3450).unwrap();
        assert_eq!(
            t.timers,
            vec![TimerCommand::ScheduleNextTrial {
                delay: INTER_TRIAL_DELAY
            }]
        );
        assert_matches!(
            t.outcomes.as_slice(),
            [Outcome::Recorded(r)] if r.response_time_ms == 450
                && r.sequence_number == 1
                && r.manhattan_error == 0
        );

        // second click before the next reveal does nothing
        assert!(m.handle(TrialEvent::Respond(target), 3500).unwrap().is_noop());
        assert_eq!(m.records().len(), 1);
        assert_eq!(m.state().phase, Phase::Idle);
        assert_eq!(m.state().current_index, 1);
        assert_eq!(m.state().current_target, None);
        assert_eq!(m.state().response_started_at, None);
    }

    #[test]
    fn delay_elapsed_only_counts_after_a_response() {
        let mut m = machine(Mode::Existing);
        assert!(m.handle(TrialEvent::DelayElapsed, 0).unwrap().is_noop());

        m.handle(TrialEvent::Start, 0).unwrap();
        reveal(&mut m, 0);
        m.handle(TrialEvent::Respond(1), 4000).unwrap();

        let t = m.handle(TrialEvent::DelayElapsed, 4500).unwrap();
        assert_eq!(m.state().phase, Phase::CountingDown);
        assert_eq!(m.state().preview_target, Some(m.order()[1]));
        assert_eq!(t.timers.len(), 1);

        assert!(m.handle(TrialEvent::DelayElapsed, 4600).unwrap().is_noop());
    }

    fn run_trial(m: &mut TrialMachine, now: &mut Millis, cell: Cell) -> Transition {
        if m.records().is_empty() && m.state().phase == Phase::Idle {
            m.handle(TrialEvent::Start, *now).unwrap();
        } else {
            m.handle(TrialEvent::DelayElapsed, *now).unwrap();
        }
        reveal(m, *now);
        *now += 3000 + 200;
        let t = m.handle(TrialEvent::Respond(cell), *now).unwrap();
        *now += 500;
        t
    }

    #[test]
    fn timed_session_terminates_after_every_cell() {
        let mut m = machine(Mode::Existing);
        let mut now = 0;
        for i in 0..34 {
            let target = m.order()[i];
            let t = run_trial(&mut m, &mut now, target);
            assert_eq!(t.outcomes.len(), 1, "trial {} should only record", i + 1);
        }
        let last = m.order()[34];
        let t = run_trial(&mut m, &mut now, last);

        assert_eq!(m.state().phase, Phase::Terminated);
        assert!(t.timers.is_empty());
        let report = match t.outcomes.as_slice() {
            [Outcome::Recorded(_), Outcome::Finished(report)] => report.clone(),
            other => panic!("unexpected outcomes {:?}", other),
        };
        assert_eq!(report.records.len(), 35);
        assert_eq!(report.summary.average_response_time_ms, 200);
        assert_eq!(report.summary.accuracy_rate_percent, 100.0);
        assert_eq!(report.summary.average_manhattan_error, 0.0);

        // nothing moves once terminated
        assert!(m.handle(TrialEvent::DelayElapsed, now).unwrap().is_noop());
        assert!(m.handle(TrialEvent::Respond(1), now).unwrap().is_noop());
        assert_eq!(m.records().len(), 35);
    }

    #[test]
    fn fresh_session_does_not_inherit_records() {
        let mut first = machine(Mode::Proposed);
        let mut now = 0;
        for i in 0..35 {
            let target = first.order()[i];
            run_trial(&mut first, &mut now, target);
        }
        assert_eq!(first.state().phase, Phase::Terminated);

        let mut second = machine(Mode::Proposed);
        assert_eq!(second.order(), first.order());
        let target = second.order()[0];
        let t = run_trial(&mut second, &mut now, target);
        assert_eq!(t.outcomes.len(), 1);
        assert_eq!(second.records().len(), 1);
        assert_eq!(second.state().phase, Phase::Idle);
    }

    #[test]
    fn practice_wraps_and_never_terminates() {
        let mut m = machine(Mode::Practice);
        let mut now = 0;
        for _ in 0..35 {
            let t = run_trial(&mut m, &mut now, 1);
            assert!(t
                .outcomes
                .iter()
                .all(|o| matches!(o, Outcome::Recorded(_))));
        }
        assert_eq!(m.state().current_index, 0);
        assert_eq!(m.state().phase, Phase::Idle);

        let t = run_trial(&mut m, &mut now, 1);
        assert_matches!(t.outcomes.as_slice(), [Outcome::Recorded(r)] if r.sequence_number == 1);
        assert_eq!(m.records().len(), 36);
    }

    #[test]
    fn abort_cancels_timers_and_freezes_session() {
        let mut m = machine(Mode::Practice);
        m.handle(TrialEvent::Start, 0).unwrap();
        m.handle(TrialEvent::CountdownTick, 1000).unwrap();

        let t = m.handle(TrialEvent::Abort, 1500).unwrap();
        assert_eq!(t.timers, vec![TimerCommand::CancelAll]);
        assert_eq!(t.outcomes, vec![Outcome::Aborted]);
        assert_eq!(m.state().phase, Phase::Aborted);
        assert_eq!(m.state().preview_target, None);

        assert!(m.handle(TrialEvent::CountdownTick, 2000).unwrap().is_noop());
        assert!(m.handle(TrialEvent::Abort, 2000).unwrap().is_noop());
    }

    #[test]
    fn abort_in_timed_mode_exports_nothing() {
        let mut m = machine(Mode::Existing);
        m.handle(TrialEvent::Start, 0).unwrap();
        reveal(&mut m, 0);
        let t = m.handle(TrialEvent::Abort, 3100).unwrap();
        assert!(t
            .outcomes
            .iter()
            .all(|o| !matches!(o, Outcome::Finished(_))));
    }
}
