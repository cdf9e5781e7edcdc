//! Input plumbing for the interactive timer.
//!
//! Key presses arrive from a background reader thread over a channel. When
//! nothing is pressed within one display interval the runner yields `Tick`,
//! which only asks the screen to redraw the running clock. Timing state is
//! never touched by a tick.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What the timer loop wakes up for
#[derive(Clone, Debug)]
pub enum TimerEvent {
    Key(KeyEvent),
    /// The display interval passed with no key press
    Tick,
}

/// What a key press asks the timer to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerAction {
    /// Start when idle, stop when running, submit when stopped
    Toggle,
    Submit,
    Reset,
    Quit,
}

impl TimerAction {
    pub fn from_key(key: &KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(TimerAction::Quit);
        }
        match key.code {
            KeyCode::Char(' ') => Some(TimerAction::Toggle),
            KeyCode::Enter | KeyCode::Char('s') => Some(TimerAction::Submit),
            KeyCode::Char('r') | KeyCode::Backspace => Some(TimerAction::Reset),
            KeyCode::Esc | KeyCode::Char('q') => Some(TimerAction::Quit),
            _ => None,
        }
    }
}

/// Where the timer's key presses come from
pub trait TimerEventSource: Send + 'static {
    /// Wait up to `timeout` for the next key press
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError>;
}

/// Reads key presses from the terminal. Key releases are dropped so a
/// single tap on space never starts and stops the clock at once.
pub struct CrosstermEventSource {
    rx: Receiver<TimerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => {
                    if tx.send(TimerEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// How often the running clock is redrawn
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Replays key presses pushed into a channel, for driving the timer without a terminal
pub struct TestEventSource {
    rx: Receiver<TimerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TimerEvent>) -> Self {
        Self { rx }
    }
}

impl TimerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Hands the timer loop one key press or redraw at a time
pub struct Runner<E: TimerEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: TimerEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Next key press, or `Tick` once the interval passes or input has closed
    pub fn step(&self) -> TimerEvent {
        self.event_source
            .recv_timeout(self.ticker.interval())
            .unwrap_or(TimerEvent::Tick)
    }
}
