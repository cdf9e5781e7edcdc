//! Pre-commit checks for commutes and sessions.
//!
//! Validation only ever looks at pending entities. Missing session ids and
//! dates are repaired rather than rejected; everything else is an error the
//! user can correct.

use crate::config::Config;
use crate::error::ValidationError;
use crate::model::{Commute, CommuteId, Mode, NewCommute, PendingSession, Session};
use chrono::{DateTime, Local};

#[derive(Debug, Clone)]
pub struct Validator {
    modes: Vec<String>,
    default_mode: Mode,
}

impl Validator {
    pub fn new(config: &Config) -> Self {
        let modes: Vec<String> = config
            .modes
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        let default_mode = modes
            .iter()
            .find(|m| m.eq_ignore_ascii_case(config.default_mode.trim()))
            .or_else(|| modes.first())
            .cloned()
            .unwrap_or_else(|| config.default_mode.trim().to_string());

        Self {
            modes,
            default_mode: Mode::new(default_mode),
        }
    }

    pub fn default_mode(&self) -> &Mode {
        &self.default_mode
    }

    /// Case-insensitive membership check returning the configured spelling
    pub fn resolve_mode(&self, raw: &str) -> Result<Mode, ValidationError> {
        let wanted = raw.trim();
        self.modes
            .iter()
            .find(|m| m.eq_ignore_ascii_case(wanted))
            .map(|m| Mode::new(m.clone()))
            .ok_or_else(|| ValidationError::InvalidMode(raw.to_string()))
    }

    /// Validate a commute about to be created. A blank mode falls back to the default.
    pub fn validate_commute(
        &self,
        pending: NewCommute,
        now: DateTime<Local>,
    ) -> Result<Commute, ValidationError> {
        let name = pending.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let mode = match pending.mode.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => self.resolve_mode(raw)?,
            _ => self.default_mode.clone(),
        };

        Ok(Commute {
            id: CommuteId::new(),
            name: name.to_string(),
            mode,
            created_at: now,
        })
    }

    /// Validate a session about to be committed. `fallback_mode` is used when
    /// the pending session names none.
    pub fn validate_session(
        &self,
        pending: PendingSession,
        fallback_mode: &Mode,
        now: DateTime<Local>,
    ) -> Result<Session, ValidationError> {
        if !pending.duration_secs.is_finite() {
            return Err(ValidationError::NonFiniteDuration);
        }
        if pending.duration_secs < 0.0 {
            return Err(ValidationError::NegativeDuration);
        }

        let mode = match pending.mode.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => self.resolve_mode(raw)?,
            _ => fallback_mode.clone(),
        };

        Ok(Session {
            id: pending.id.unwrap_or_default(),
            commute_id: pending.commute_id,
            date: pending.date.unwrap_or(now),
            duration_secs: pending.duration_secs,
            mode,
        })
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
