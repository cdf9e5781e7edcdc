use std::sync::mpsc;
use std::time::Duration;

use commute_pro::config::Config;
use commute_pro::model::CommuteId;
use commute_pro::runtime::{FixedTicker, Runner, TestEventSource, TimerAction, TimerEvent};
use commute_pro::store::MemoryStore;
use commute_pro::timing::{ManualClock, SubmitOutcome, TimingPhase};
use commute_pro::Tracker;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

type TestTracker = Tracker<MemoryStore, ManualClock>;

fn key(code: KeyCode) -> TimerEvent {
    TimerEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
}

// Same dispatch the CLI timer uses: toggle walks the state machine forward,
// quit ends the loop. Each start advances the clock by `trip_secs`.
fn drive(
    tracker: &mut TestTracker,
    clock: &ManualClock,
    id: CommuteId,
    keys: &[KeyCode],
    trip_secs: f64,
) -> Vec<SubmitOutcome> {
    let (tx, rx) = mpsc::channel();
    for code in keys {
        tx.send(key(*code)).unwrap();
    }
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    let mut outcomes = Vec::new();
    for _ in 0..200u32 {
        let TimerEvent::Key(key) = runner.step() else {
            // Ticks only redraw; elapsed is read, never mutated
            let _ = tracker.elapsed(id);
            continue;
        };
        let Some(action) = TimerAction::from_key(&key) else {
            continue;
        };
        match (action, tracker.timing_phase(id)) {
            (TimerAction::Quit, _) => break,
            (TimerAction::Reset, _) => tracker.reset_timing(id),
            (TimerAction::Toggle, TimingPhase::Idle) => {
                tracker.start_timing(id).unwrap();
                clock.advance_secs(trip_secs);
            }
            (TimerAction::Toggle | TimerAction::Submit, TimingPhase::Running) => {
                tracker.stop_timing(id).unwrap();
            }
            (TimerAction::Toggle | TimerAction::Submit, TimingPhase::AwaitingSubmit) => {
                outcomes.push(tracker.submit_timing(id, None).unwrap());
            }
            (TimerAction::Submit, TimingPhase::Idle) => {}
        }
    }
    outcomes
}

fn setup() -> (TestTracker, ManualClock, CommuteId) {
    let clock = ManualClock::default();
    let mut tracker =
        Tracker::with_clock(MemoryStore::new(), Config::default(), clock.clone()).unwrap();
    let id = tracker.create_commute("Home", Some("bike")).unwrap();
    (tracker, clock, id)
}

#[test]
fn headless_timing_flow_records_a_session() {
    let (mut tracker, clock, id) = setup();

    let outcomes = drive(
        &mut tracker,
        &clock,
        id,
        &[KeyCode::Char(' '), KeyCode::Char(' '), KeyCode::Enter, KeyCode::Char('q')],
        95.0,
    );

    assert_eq!(outcomes.len(), 1);
    let outcome = &outcomes[0];
    assert!(outcome.committed);
    assert!(outcome.is_pr);
    assert_eq!(outcome.best_previous, None);
    assert!((outcome.candidate_secs - 95.0).abs() < 1e-6);

    assert_eq!(tracker.timing_phase(id), TimingPhase::Idle);
    let sessions = tracker.sessions_for(id).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].mode.as_str(), "bike");
}

#[test]
fn headless_reset_discards_the_attempt() {
    let (mut tracker, clock, id) = setup();

    let outcomes = drive(
        &mut tracker,
        &clock,
        id,
        &[KeyCode::Char(' '), KeyCode::Char(' '), KeyCode::Char('r'), KeyCode::Enter, KeyCode::Esc],
        60.0,
    );

    assert!(outcomes.is_empty());
    assert_eq!(tracker.timing_phase(id), TimingPhase::Idle);
    assert!(tracker.sessions_for(id).unwrap().is_empty());
}

#[test]
fn headless_quick_tap_is_dropped() {
    let (mut tracker, clock, id) = setup();

    let outcomes = drive(
        &mut tracker,
        &clock,
        id,
        &[KeyCode::Char(' '), KeyCode::Char(' '), KeyCode::Char(' '), KeyCode::Char('q')],
        0.4,
    );

    assert_eq!(outcomes.len(), 1);
    assert!(!outcomes[0].committed);
    assert!(outcomes[0].too_short);
    assert!(tracker.sessions_for(id).unwrap().is_empty());
}

#[test]
fn headless_second_trip_compares_against_the_first() {
    let (mut tracker, clock, id) = setup();
    let trip = [KeyCode::Char(' '), KeyCode::Char(' '), KeyCode::Enter, KeyCode::Char('q')];

    drive(&mut tracker, &clock, id, &trip, 120.0);
    let slower = drive(&mut tracker, &clock, id, &trip, 130.0);
    let faster = drive(&mut tracker, &clock, id, &trip, 110.0);

    assert!(!slower[0].is_pr);
    assert_eq!(slower[0].best_previous, Some(120.0));
    assert!(faster[0].is_pr);
    assert_eq!(faster[0].best_previous, Some(120.0));
    assert_eq!(tracker.get_statistics(id).unwrap().count, 3);
}
