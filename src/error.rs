use crate::model::{CommuteId, SessionId};
use crate::timing::TimingPhase;
use thiserror::Error;

/// A timing operation was attempted in the wrong phase
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot {operation} while timing is {phase}")]
pub struct InvalidStateError {
    pub operation: &'static str,
    pub phase: TimingPhase,
}

/// Pending entity rejected before commit
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("commute name cannot be empty")]
    EmptyName,

    #[error("invalid commute mode: {0}")]
    InvalidMode(String),

    #[error("session duration cannot be negative")]
    NegativeDuration,

    #[error("session duration must be a finite number of seconds")]
    NonFiniteDuration,

    #[error("session of {duration_secs}s is under the {min_secs}s minimum")]
    TooShort { duration_secs: f64, min_secs: f64 },
}

/// Failures of the entity store
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The underlying save failed; nothing was committed
    #[error("failed to save data: {0}")]
    Persistence(String),

    #[error("commute not found: {0}")]
    CommuteNotFound(CommuteId),

    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}

/// Why a submit did not go through. The candidate is kept for every variant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Main error type for commute-pro operations
#[derive(Error, Debug)]
pub enum CommuteError {
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A commute name or id given on input did not match anything stored
    #[error("No commute matches '{0}'")]
    UnknownCommute(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<SubmitError> for CommuteError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::InvalidState(e) => CommuteError::InvalidState(e),
            SubmitError::Validation(e) => CommuteError::Validation(e),
            SubmitError::Store(e) => CommuteError::Store(e),
        }
    }
}

/// Result type alias for commute-pro operations
pub type Result<T> = std::result::Result<T, CommuteError>;

impl CommuteError {
    /// Message suitable for showing to the person using the app
    pub fn user_message(&self) -> String {
        match self {
            CommuteError::InvalidState(e) => format!("That isn't possible right now: {}", e),
            CommuteError::Validation(ValidationError::EmptyName) => {
                "Please give the commute a name".to_string()
            }
            CommuteError::Validation(ValidationError::InvalidMode(mode)) => {
                format!("'{}' is not one of the configured modes", mode)
            }
            CommuteError::Validation(ValidationError::NegativeDuration) => {
                "A commute can't take a negative amount of time".to_string()
            }
            CommuteError::Validation(ValidationError::NonFiniteDuration) => {
                "That duration is not a number of seconds".to_string()
            }
            CommuteError::Validation(ValidationError::TooShort { min_secs, .. }) => {
                format!("Trips shorter than {}s are not recorded", min_secs)
            }
            CommuteError::Store(StoreError::Persistence(_)) => {
                "Your commute could not be saved. Please try again.".to_string()
            }
            CommuteError::Store(e) => e.to_string(),
            CommuteError::Io(e) => format!("File system error. Check permissions. Details: {}", e),
            CommuteError::Csv(e) => format!("Could not write CSV: {}", e),
            CommuteError::Json(e) => format!("Data format error: {}", e),
            CommuteError::Config(msg) => format!("Configuration issue: {}", msg),
            CommuteError::UnknownCommute(query) => {
                format!("No commute named '{}'. Try `commute list`.", query)
            }
            CommuteError::InvalidInput(msg) => msg.clone(),
        }
    }
}
