//! Operations the user interface calls into.
//!
//! A `Tracker` owns the store, the active configuration and one timing
//! attempt per commute. Starting a second attempt for the same commute while
//! one is running or waiting to be submitted fails instead of replacing it.

use crate::config::{Config, MissingModePolicy};
use crate::error::{CommuteError, InvalidStateError, Result, ValidationError};
use crate::model::{Commute, CommuteId, NewCommute, PendingSession, Session, SessionId};
use crate::record::Statistics;
use crate::store::EntityStore;
use crate::timing::{Clock, SubmitOutcome, SystemClock, TimingPhase, TimingSession};
use crate::validation::Validator;
use chrono::{DateTime, Local};
use std::collections::HashMap;

#[derive(Debug)]
pub struct Tracker<S: EntityStore, C: Clock = SystemClock> {
    store: S,
    clock: C,
    config: Config,
    validator: Validator,
    timings: HashMap<CommuteId, TimingSession>,
}

impl<S: EntityStore> Tracker<S, SystemClock> {
    pub fn new(store: S, config: Config) -> Result<Self> {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: EntityStore, C: Clock> Tracker<S, C> {
    pub fn with_clock(store: S, config: Config, clock: C) -> Result<Self> {
        config.check()?;
        let validator = Validator::new(&config);
        Ok(Self {
            store,
            clock,
            config,
            validator,
            timings: HashMap::new(),
        })
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    // ── commutes ──────────────────────────────────────────────────────

    pub fn create_commute(&mut self, name: &str, mode: Option<&str>) -> Result<CommuteId> {
        let commute = self
            .validator
            .validate_commute(NewCommute::new(name, mode), self.clock.now())?;
        self.store.insert_commute(&commute)?;
        tracing::info!(id = %commute.id, name = %commute.name, mode = %commute.mode, "commute created");
        Ok(commute.id)
    }

    pub fn commute(&self, id: CommuteId) -> Result<Commute> {
        Ok(self.store.commute(id)?)
    }

    pub fn commutes(&self) -> Result<Vec<Commute>> {
        Ok(self.store.commutes()?)
    }

    /// Look a commute up by id, or by name ignoring case
    pub fn find_commute(&self, query: &str) -> Result<Commute> {
        if let Ok(id) = query.parse::<CommuteId>() {
            if let Ok(commute) = self.store.commute(id) {
                return Ok(commute);
            }
        }
        let wanted = query.trim();
        self.store
            .commutes()?
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CommuteError::UnknownCommute(query.to_string()))
    }

    /// Delete a commute and its sessions. Any attempt in flight for it is dropped.
    pub fn delete_commute(&mut self, id: CommuteId) -> Result<()> {
        self.store.delete_commute(id)?;
        self.timings.remove(&id);
        tracing::info!(id = %id, "commute deleted");
        Ok(())
    }

    // ── timing ────────────────────────────────────────────────────────

    pub fn timing_phase(&self, id: CommuteId) -> TimingPhase {
        self.timings
            .get(&id)
            .map(TimingSession::phase)
            .unwrap_or(TimingPhase::Idle)
    }

    /// Seconds on the clock for the commute's current attempt; zero when idle
    pub fn elapsed(&self, id: CommuteId) -> f64 {
        self.timings
            .get(&id)
            .map(|t| t.elapsed_secs(self.clock.now()))
            .unwrap_or(0.0)
    }

    pub fn start_timing(&mut self, id: CommuteId) -> Result<()> {
        self.store.commute(id)?;
        let now = self.clock.now();
        self.timings.entry(id).or_default().start(now)?;
        Ok(())
    }

    pub fn stop_timing(&mut self, id: CommuteId) -> Result<f64> {
        let now = self.clock.now();
        match self.timings.get_mut(&id) {
            Some(timing) => Ok(timing.stop(now)?),
            None => Err(InvalidStateError {
                operation: "stop",
                phase: TimingPhase::Idle,
            }
            .into()),
        }
    }

    pub fn reset_timing(&mut self, id: CommuteId) {
        if let Some(mut timing) = self.timings.remove(&id) {
            timing.reset();
        }
    }

    pub fn submit_timing(&mut self, id: CommuteId, mode: Option<&str>) -> Result<SubmitOutcome> {
        let now = self.clock.now();
        let timing = self.timings.get_mut(&id).ok_or(InvalidStateError {
            operation: "submit",
            phase: TimingPhase::Idle,
        })?;
        if timing.phase() != TimingPhase::AwaitingSubmit {
            return Err(InvalidStateError {
                operation: "submit",
                phase: timing.phase(),
            }
            .into());
        }

        let commute = self.store.commute(id)?;
        let outcome = timing.submit(
            &commute,
            mode,
            &mut self.store,
            &self.validator,
            &self.config,
            now,
        )?;

        if timing.phase() == TimingPhase::Idle {
            self.timings.remove(&id);
        }
        Ok(outcome)
    }

    // ── sessions ──────────────────────────────────────────────────────

    /// Record a trip timed elsewhere. Durations under `simple_min_secs` are
    /// rejected and nothing is stored.
    pub fn add_manual_session(
        &mut self,
        id: CommuteId,
        duration_secs: f64,
        date: Option<DateTime<Local>>,
        mode: Option<&str>,
    ) -> Result<Session> {
        let commute = self.store.commute(id)?;
        let now = self.clock.now();

        let mut pending = PendingSession::new(id, duration_secs);
        pending.date = date;
        pending.mode = mode.map(str::to_string);

        let fallback = match self.config.missing_mode {
            MissingModePolicy::Commute => &commute.mode,
            MissingModePolicy::Global => self.validator.default_mode(),
        };
        let session = self.validator.validate_session(pending, fallback, now)?;
        let min_secs = self.config.simple_min_secs;
        if session.duration_secs < min_secs {
            return Err(ValidationError::TooShort {
                duration_secs: session.duration_secs,
                min_secs,
            }
            .into());
        }
        self.store.add_session(&session)?;
        tracing::info!(
            commute = %commute.name,
            duration_secs = session.duration_secs,
            "manual session recorded"
        );
        Ok(session)
    }

    pub fn delete_session(&mut self, id: SessionId) -> Result<()> {
        self.store.delete_session(id)?;
        tracing::info!(id = %id, "session deleted");
        Ok(())
    }

    /// Drop a commute's whole history, keeping the commute itself
    pub fn clear_sessions(&mut self, id: CommuteId) -> Result<usize> {
        self.store.commute(id)?;
        let removed = self.store.clear_sessions(id)?;
        tracing::info!(id = %id, removed, "sessions cleared");
        Ok(removed)
    }

    pub fn sessions_for(&self, id: CommuteId) -> Result<Vec<Session>> {
        Ok(self.store.sessions_for(id)?)
    }

    /// Average, best and count over valid sessions. Unknown or deleted
    /// commutes are reported as not found.
    pub fn get_statistics(&self, id: CommuteId) -> Result<Statistics> {
        Ok(self.store.statistics(id, self.clock.now())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StoreError, ValidationError};
    use crate::store::MemoryStore;
    use crate::timing::ManualClock;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn tracker() -> (Tracker<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::default();
        let tracker =
            Tracker::with_clock(MemoryStore::new(), Config::default(), clock.clone()).unwrap();
        (tracker, clock)
    }

    fn time_trip(
        tracker: &mut Tracker<MemoryStore, ManualClock>,
        clock: &ManualClock,
        id: CommuteId,
        secs: f64,
    ) -> SubmitOutcome {
        tracker.start_timing(id).unwrap();
        clock.advance_secs(secs);
        tracker.stop_timing(id).unwrap();
        tracker.submit_timing(id, None).unwrap()
    }

    #[test]
    fn rejects_inconsistent_config() {
        let config = Config {
            default_mode: "canoe".into(),
            ..Config::default()
        };
        assert_matches!(
            Tracker::new(MemoryStore::new(), config),
            Err(CommuteError::Config(_))
        );
    }

    #[test]
    fn create_commute_validates() {
        let (mut tracker, _) = tracker();
        assert_matches!(
            tracker.create_commute("  ", Some("bike")),
            Err(CommuteError::Validation(ValidationError::EmptyName))
        );
        assert_matches!(
            tracker.create_commute("Home", Some("zeppelin")),
            Err(CommuteError::Validation(ValidationError::InvalidMode(_)))
        );
        let id = tracker.create_commute("Home", None).unwrap();
        assert_eq!(tracker.commute(id).unwrap().mode.as_str(), "walk");
    }

    #[test]
    fn find_commute_by_name_or_id() {
        let (mut tracker, _) = tracker();
        let id = tracker.create_commute("Home To Work", Some("bike")).unwrap();
        assert_eq!(tracker.find_commute("home to work").unwrap().id, id);
        assert_eq!(tracker.find_commute(&id.to_string()).unwrap().id, id);
        assert_matches!(
            tracker.find_commute("Gym"),
            Err(CommuteError::UnknownCommute(q)) if q == "Gym"
        );
    }

    #[test]
    fn start_unknown_commute_fails() {
        let (mut tracker, _) = tracker();
        assert_matches!(
            tracker.start_timing(CommuteId::new()),
            Err(CommuteError::Store(StoreError::CommuteNotFound(_)))
        );
    }

    #[test]
    fn one_attempt_per_commute() {
        let (mut tracker, clock) = tracker();
        let home = tracker.create_commute("Home", Some("bike")).unwrap();
        let gym = tracker.create_commute("Gym", Some("run")).unwrap();

        tracker.start_timing(home).unwrap();
        clock.advance_secs(4.0);
        assert_matches!(tracker.start_timing(home), Err(CommuteError::InvalidState(_)));
        assert_eq!(tracker.elapsed(home), 4.0);

        tracker.start_timing(gym).unwrap();
        assert_eq!(tracker.timing_phase(gym), TimingPhase::Running);
    }

    #[test]
    fn stop_and_submit_require_an_attempt() {
        let (mut tracker, _) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        assert_matches!(tracker.stop_timing(id), Err(CommuteError::InvalidState(_)));
        assert_matches!(
            tracker.submit_timing(id, None),
            Err(CommuteError::InvalidState(_))
        );

        tracker.start_timing(id).unwrap();
        assert_matches!(
            tracker.submit_timing(id, None),
            Err(CommuteError::InvalidState(InvalidStateError {
                phase: TimingPhase::Running,
                ..
            }))
        );
    }

    #[test]
    fn reset_is_idempotent() {
        let (mut tracker, clock) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        tracker.reset_timing(id);
        tracker.start_timing(id).unwrap();
        clock.advance_secs(60.0);
        tracker.stop_timing(id).unwrap();
        tracker.reset_timing(id);
        tracker.reset_timing(id);
        assert_eq!(tracker.timing_phase(id), TimingPhase::Idle);
        assert!(tracker.sessions_for(id).unwrap().is_empty());
    }

    #[test]
    fn submit_reports_records() {
        let (mut tracker, clock) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();

        let first = time_trip(&mut tracker, &clock, id, 140.0);
        assert!(first.committed && first.is_pr);

        let slower = time_trip(&mut tracker, &clock, id, 150.0);
        assert!(slower.committed && !slower.is_pr);

        let tie = time_trip(&mut tracker, &clock, id, 140.0);
        assert!(tie.is_pr);
        assert_eq!(tie.best_previous, Some(140.0));

        assert_eq!(tracker.timing_phase(id), TimingPhase::Idle);
        let stats = tracker.get_statistics(id).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.best_secs, 140.0);
    }

    #[test]
    fn noise_submit_leaves_store_unchanged() {
        let (mut tracker, clock) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        let outcome = time_trip(&mut tracker, &clock, id, 0.8);
        assert!(!outcome.committed);
        assert!(outcome.too_short);
        assert!(tracker.sessions_for(id).unwrap().is_empty());
        assert_eq!(tracker.timing_phase(id), TimingPhase::Idle);
    }

    #[test]
    fn failed_submit_can_be_retried() {
        let (mut tracker, clock) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        tracker.start_timing(id).unwrap();
        clock.advance_secs(300.0);
        tracker.stop_timing(id).unwrap();

        assert_matches!(
            tracker.submit_timing(id, Some("rocket")),
            Err(CommuteError::Validation(ValidationError::InvalidMode(_)))
        );
        assert_eq!(tracker.timing_phase(id), TimingPhase::AwaitingSubmit);

        let outcome = tracker.submit_timing(id, Some("run")).unwrap();
        assert!(outcome.committed);
        assert_eq!(outcome.candidate_secs, 300.0);
    }

    #[test]
    fn manual_session_round_trip() {
        let (mut tracker, clock) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        let past = clock.now() - Duration::days(1);
        tracker
            .add_manual_session(id, 125.0, Some(past), Some("bike"))
            .unwrap();

        let stats = tracker.get_statistics(id).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.best_secs, 125.0);
        assert_eq!(stats.average_secs, 125.0);
    }

    #[test]
    fn manual_session_validation() {
        let (mut tracker, _) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        assert_matches!(
            tracker.add_manual_session(id, -3.0, None, None),
            Err(CommuteError::Validation(ValidationError::NegativeDuration))
        );
        assert_matches!(
            tracker.add_manual_session(id, f64::INFINITY, None, None),
            Err(CommuteError::Validation(ValidationError::NonFiniteDuration))
        );
        let s = tracker.add_manual_session(id, 90.0, None, None).unwrap();
        assert_eq!(s.date, tracker.now());
        assert_eq!(s.mode.as_str(), "bike");
    }

    #[test]
    fn manual_session_below_minimum_is_not_stored() {
        let (mut tracker, _) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        tracker.add_manual_session(id, 120.0, None, None).unwrap();

        for secs in [0.0, 0.3, 0.99] {
            assert_matches!(
                tracker.add_manual_session(id, secs, None, None),
                Err(CommuteError::Validation(ValidationError::TooShort { min_secs, .. }))
                    if min_secs == 1.0
            );
        }
        assert_eq!(tracker.sessions_for(id).unwrap().len(), 1);
        assert_eq!(tracker.get_statistics(id).unwrap().best_secs, 120.0);
    }

    #[test]
    fn delete_commute_drops_sessions_and_attempt() {
        let (mut tracker, clock) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        time_trip(&mut tracker, &clock, id, 100.0);
        tracker.start_timing(id).unwrap();

        tracker.delete_commute(id).unwrap();
        assert!(tracker.sessions_for(id).unwrap().is_empty());
        assert_eq!(tracker.timing_phase(id), TimingPhase::Idle);
        assert_matches!(
            tracker.get_statistics(id),
            Err(CommuteError::Store(StoreError::CommuteNotFound(_)))
        );
    }

    #[test]
    fn delete_and_clear_sessions() {
        let (mut tracker, clock) = tracker();
        let id = tracker.create_commute("Home", Some("bike")).unwrap();
        let a = time_trip(&mut tracker, &clock, id, 100.0).session.unwrap();
        time_trip(&mut tracker, &clock, id, 110.0);
        time_trip(&mut tracker, &clock, id, 120.0);

        tracker.delete_session(a.id).unwrap();
        assert_eq!(tracker.sessions_for(id).unwrap().len(), 2);
        assert_eq!(tracker.get_statistics(id).unwrap().best_secs, 110.0);

        assert_eq!(tracker.clear_sessions(id).unwrap(), 2);
        assert!(tracker.get_statistics(id).unwrap().is_empty());
    }
}
