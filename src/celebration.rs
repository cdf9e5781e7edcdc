use crate::timing::SubmitOutcome;
use crate::util::format_duration;
use rand::seq::SliceRandom;
use rand::Rng;

const RECORD_HEADLINES: [&str; 6] = [
    "NEW PR!",
    "PERSONAL BEST!",
    "RECORD TIME!",
    "FASTEST YET!",
    "UNSTOPPABLE!",
    "BLAZING!",
];

const STEADY_HEADLINES: [&str; 4] = ["Logged.", "Trip saved.", "Nice ride.", "Another one down."];

/// What kind of feedback a submit earned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CelebrationKind {
    /// First valid trip for the commute
    FirstRecord,
    /// Beat or tied the previous best
    Record,
    /// Saved, but slower than the best
    Logged,
}

/// Feedback for the presentation layer after a committed session
#[derive(Debug, Clone, PartialEq)]
pub struct Celebration {
    pub kind: CelebrationKind,
    pub headline: String,
    pub detail: String,
}

impl Celebration {
    /// `None` when nothing was committed
    pub fn for_outcome(outcome: &SubmitOutcome) -> Option<Self> {
        Self::for_outcome_with(outcome, &mut rand::thread_rng())
    }

    pub fn for_outcome_with<R: Rng + ?Sized>(outcome: &SubmitOutcome, rng: &mut R) -> Option<Self> {
        if !outcome.committed {
            return None;
        }

        let time = format_duration(outcome.candidate_secs);
        let verdict = outcome.verdict();

        let (kind, detail) = match verdict.best_previous {
            None => (
                CelebrationKind::FirstRecord,
                format!("{} is your first time on the board", time),
            ),
            Some(best) if verdict.is_pr => {
                let gained = verdict.improvement_secs(outcome.candidate_secs).unwrap_or(0.0);
                let detail = if gained > 0.0 {
                    format!(
                        "{} beats your old best {} by {:.1}s",
                        time,
                        format_duration(best),
                        gained
                    )
                } else {
                    format!("{} ties your best", time)
                };
                (CelebrationKind::Record, detail)
            }
            Some(best) => {
                let gap = verdict.gap_secs(outcome.candidate_secs).unwrap_or(0.0);
                (
                    CelebrationKind::Logged,
                    format!(
                        "{} is {:.1}s off your best of {}",
                        time,
                        gap,
                        format_duration(best)
                    ),
                )
            }
        };

        let pool: &[&str] = match kind {
            CelebrationKind::Logged => &STEADY_HEADLINES,
            _ => &RECORD_HEADLINES,
        };
        let headline = pool.choose(rng).copied().unwrap_or("NEW PR!").to_string();

        Some(Self {
            kind,
            headline,
            detail,
        })
    }

    pub fn is_record(&self) -> bool {
        self.kind != CelebrationKind::Logged
    }
}
