//! Personal-record detection and the statistics shown next to it.
//!
//! Both work off the same population: sessions with a positive duration
//! that are not dated in the future. Anything else is ignored, so the best
//! time displayed to the user is always the one a new run is compared to.

use crate::model::Session;
use crate::util::{mean, std_dev};
use chrono::{DateTime, Local};
use serde::Serialize;

/// Verdict for a candidate duration against a commute's history
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrVerdict {
    pub is_pr: bool,
    pub best_previous: Option<f64>,
}

impl PrVerdict {
    /// Seconds shaved off the previous best; `None` for first sessions and non-records
    pub fn improvement_secs(&self, candidate_secs: f64) -> Option<f64> {
        match (self.is_pr, self.best_previous) {
            (true, Some(best)) => Some(best - candidate_secs),
            _ => None,
        }
    }

    /// Seconds slower than the best; `None` when the candidate is a record
    pub fn gap_secs(&self, candidate_secs: f64) -> Option<f64> {
        match (self.is_pr, self.best_previous) {
            (false, Some(best)) => Some(candidate_secs - best),
            _ => None,
        }
    }
}

/// Sessions eligible for records and statistics at `now`
pub fn valid_sessions<'a>(
    history: &'a [Session],
    now: DateTime<Local>,
) -> impl Iterator<Item = &'a Session> + 'a {
    history.iter().filter(move |s| s.is_valid_at(now))
}

/// Decide whether `candidate_secs` is a personal record. `history` must not
/// contain the candidate itself. Ties count as records.
pub fn evaluate(candidate_secs: f64, history: &[Session], now: DateTime<Local>) -> PrVerdict {
    let best_previous = valid_sessions(history, now)
        .map(|s| s.duration_secs)
        .min_by(f64::total_cmp);

    match best_previous {
        None => PrVerdict {
            is_pr: true,
            best_previous: None,
        },
        Some(best) => PrVerdict {
            is_pr: candidate_secs <= best,
            best_previous: Some(best),
        },
    }
}

/// Summary of a commute's valid sessions. All zero when there are none.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub average_secs: f64,
    pub best_secs: f64,
    pub std_dev_secs: f64,
}

impl Statistics {
    pub fn from_sessions(history: &[Session], now: DateTime<Local>) -> Self {
        let durations: Vec<f64> = valid_sessions(history, now)
            .map(|s| s.duration_secs)
            .collect();

        let best_secs = durations
            .iter()
            .copied()
            .min_by(f64::total_cmp)
            .unwrap_or(0.0);

        Self {
            count: durations.len(),
            average_secs: mean(&durations).unwrap_or(0.0),
            best_secs,
            std_dev_secs: std_dev(&durations).unwrap_or(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
