//! Lifecycle of a single timing attempt.
//!
//! ```text
//! Idle --start--> Running --stop--> AwaitingSubmit --submit--> Idle
//!                    |                    |
//!                    +------reset---------+-----------------> Idle
//! ```
//!
//! Nothing is persisted until `submit`. A failed submit keeps the candidate
//! so it can be retried without timing the trip again.

use crate::config::{Config, MissingModePolicy};
use crate::error::{InvalidStateError, SubmitError};
use crate::model::{Commute, PendingSession, Session};
use crate::record::{self, PrVerdict};
use crate::store::EntityStore;
use crate::validation::Validator;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Hand-driven clock for tests and headless runs. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Local>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: DateTime<Local>) {
        self.now.set(now);
    }

    pub fn advance_secs(&self, secs: f64) {
        let step = chrono::Duration::microseconds((secs * 1_000_000.0).round() as i64);
        self.now.set(self.now.get() + step);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Local::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TimingPhase {
    #[strum(serialize = "idle")]
    Idle,
    #[strum(serialize = "running")]
    Running,
    #[strum(serialize = "awaiting submit")]
    AwaitingSubmit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TimingState {
    Idle,
    Running {
        started_at: DateTime<Local>,
    },
    AwaitingSubmit {
        started_at: DateTime<Local>,
        candidate_secs: f64,
    },
}

/// Result of a submit that did not fail
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitOutcome {
    pub committed: bool,
    pub is_pr: bool,
    pub best_previous: Option<f64>,
    /// The candidate was under the noise threshold and dropped without saving
    pub too_short: bool,
    pub candidate_secs: f64,
    pub session: Option<Session>,
}

impl SubmitOutcome {
    fn discarded(candidate_secs: f64) -> Self {
        Self {
            committed: false,
            is_pr: false,
            best_previous: None,
            too_short: true,
            candidate_secs,
            session: None,
        }
    }

    fn committed(session: Session, verdict: PrVerdict) -> Self {
        Self {
            committed: true,
            is_pr: verdict.is_pr,
            best_previous: verdict.best_previous,
            too_short: false,
            candidate_secs: session.duration_secs,
            session: Some(session),
        }
    }

    pub fn verdict(&self) -> PrVerdict {
        PrVerdict {
            is_pr: self.is_pr,
            best_previous: self.best_previous,
        }
    }
}

/// An in-flight attempt at timing one commute. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSession {
    state: TimingState,
}

fn secs_between(start: DateTime<Local>, end: DateTime<Local>) -> f64 {
    (end - start)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or_else(|| (end - start).num_milliseconds() as f64 / 1000.0)
}

impl TimingSession {
    pub fn new() -> Self {
        Self {
            state: TimingState::Idle,
        }
    }

    pub fn phase(&self) -> TimingPhase {
        match self.state {
            TimingState::Idle => TimingPhase::Idle,
            TimingState::Running { .. } => TimingPhase::Running,
            TimingState::AwaitingSubmit { .. } => TimingPhase::AwaitingSubmit,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        match self.state {
            TimingState::Idle => None,
            TimingState::Running { started_at } | TimingState::AwaitingSubmit { started_at, .. } => {
                Some(started_at)
            }
        }
    }

    /// Duration captured by `stop`, waiting to be submitted
    pub fn candidate_secs(&self) -> Option<f64> {
        match self.state {
            TimingState::AwaitingSubmit { candidate_secs, .. } => Some(candidate_secs),
            _ => None,
        }
    }

    /// Seconds shown on the running display. Reading it never changes state.
    pub fn elapsed_secs(&self, now: DateTime<Local>) -> f64 {
        match self.state {
            TimingState::Idle => 0.0,
            TimingState::Running { started_at } => secs_between(started_at, now),
            TimingState::AwaitingSubmit { candidate_secs, .. } => candidate_secs,
        }
    }

    fn invalid(&self, operation: &'static str) -> InvalidStateError {
        InvalidStateError {
            operation,
            phase: self.phase(),
        }
    }

    pub fn start(&mut self, now: DateTime<Local>) -> Result<(), InvalidStateError> {
        match self.state {
            TimingState::Idle => {
                self.state = TimingState::Running { started_at: now };
                tracing::debug!("timing started at {now}");
                Ok(())
            }
            _ => Err(self.invalid("start")),
        }
    }

    pub fn stop(&mut self, now: DateTime<Local>) -> Result<f64, InvalidStateError> {
        match self.state {
            TimingState::Running { started_at } => {
                let candidate_secs = secs_between(started_at, now);
                self.state = TimingState::AwaitingSubmit {
                    started_at,
                    candidate_secs,
                };
                tracing::debug!("timing stopped after {candidate_secs:.2}s");
                Ok(candidate_secs)
            }
            _ => Err(self.invalid("stop")),
        }
    }

    /// Abandon the attempt. Harmless when already idle.
    pub fn reset(&mut self) {
        if self.state != TimingState::Idle {
            tracing::debug!("timing reset from {}", self.phase());
        }
        self.state = TimingState::Idle;
    }

    pub fn discard(&mut self) {
        self.reset()
    }

    /// Validate, classify and persist the stopped attempt.
    ///
    /// Candidates under the configured noise threshold are dropped without
    /// an error (`too_short` is set on the outcome). On any error the
    /// session stays in `AwaitingSubmit`.
    pub fn submit<S: EntityStore + ?Sized>(
        &mut self,
        commute: &Commute,
        mode: Option<&str>,
        store: &mut S,
        validator: &Validator,
        config: &Config,
        now: DateTime<Local>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let candidate_secs = match self.state {
            TimingState::AwaitingSubmit { candidate_secs, .. } => candidate_secs,
            _ => return Err(self.invalid("submit").into()),
        };

        let mode = mode.map(str::trim).filter(|m| !m.is_empty());
        let min_secs = config.min_duration_secs(mode.is_some());
        if candidate_secs < min_secs {
            tracing::debug!("discarding {candidate_secs:.2}s attempt, below {min_secs}s");
            self.state = TimingState::Idle;
            return Ok(SubmitOutcome::discarded(candidate_secs));
        }

        let mut pending = PendingSession::new(commute.id, candidate_secs).with_date(now);
        if let Some(mode) = mode {
            pending = pending.with_mode(mode);
        }
        let fallback = match config.missing_mode {
            MissingModePolicy::Commute => &commute.mode,
            MissingModePolicy::Global => validator.default_mode(),
        };
        let session = validator.validate_session(pending, fallback, now)?;

        let history = store.sessions_for(commute.id)?;
        let verdict = record::evaluate(session.duration_secs, &history, now);

        store.add_session(&session)?;

        tracing::info!(
            commute = %commute.name,
            duration_secs = session.duration_secs,
            is_pr = verdict.is_pr,
            "session recorded"
        );
        self.state = TimingState::Idle;
        Ok(SubmitOutcome::committed(session, verdict))
    }
}

impl Default for TimingSession {
    fn default() -> Self {
        Self::new()
    }
}
