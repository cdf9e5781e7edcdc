use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a tracked commute, assigned once at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommuteId(Uuid);

/// Identifier of a recorded session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

macro_rules! uuid_id {
    ($ty:ident) => {
        impl $ty {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $ty {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

uuid_id!(CommuteId);
uuid_id!(SessionId);

/// A transport mode, always spelled the way the configured mode set spells it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mode(String);

impl Mode {
    pub(crate) fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, repeatable trip. Sessions point back at it by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commute {
    pub id: CommuteId,
    pub name: String,
    pub mode: Mode,
    pub created_at: DateTime<Local>,
}

/// One completed, timed occurrence of a commute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub commute_id: CommuteId,
    pub date: DateTime<Local>,
    pub duration_secs: f64,
    pub mode: Mode,
}

impl Session {
    /// Only positive durations that are not dated in the future take part in
    /// statistics and record comparisons.
    pub fn is_valid_at(&self, now: DateTime<Local>) -> bool {
        self.duration_secs > 0.0 && self.date <= now
    }
}

/// Commute as entered by the user, before validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewCommute {
    pub name: String,
    pub mode: Option<String>,
}

impl NewCommute {
    pub fn new(name: impl Into<String>, mode: Option<&str>) -> Self {
        Self {
            name: name.into(),
            mode: mode.map(str::to_string),
        }
    }
}

/// Session awaiting validation; missing id and date get filled in before commit
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSession {
    pub id: Option<SessionId>,
    pub commute_id: CommuteId,
    pub date: Option<DateTime<Local>>,
    pub duration_secs: f64,
    pub mode: Option<String>,
}

impl PendingSession {
    pub fn new(commute_id: CommuteId, duration_secs: f64) -> Self {
        Self {
            id: None,
            commute_id,
            date: None,
            duration_secs,
            mode: None,
        }
    }

    pub fn with_date(mut self, date: DateTime<Local>) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}
