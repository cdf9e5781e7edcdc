//! Persistence for commutes and their sessions.
//!
//! Commutes and sessions are plain records linked by id. Deleting a commute
//! removes its sessions; adding a session to an unknown commute fails.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::model::{Commute, CommuteId, Session, SessionId};
use crate::record::Statistics;
use chrono::{DateTime, Local};

pub trait EntityStore {
    fn insert_commute(&mut self, commute: &Commute) -> Result<(), StoreError>;

    fn commute(&self, id: CommuteId) -> Result<Commute, StoreError>;

    /// All commutes, ordered by name
    fn commutes(&self) -> Result<Vec<Commute>, StoreError>;

    /// Remove a commute together with every session it owns
    fn delete_commute(&mut self, id: CommuteId) -> Result<(), StoreError>;

    fn add_session(&mut self, session: &Session) -> Result<(), StoreError>;

    fn delete_session(&mut self, id: SessionId) -> Result<(), StoreError>;

    /// Sessions of a commute, most recent first. Unknown ids yield nothing.
    fn sessions_for(&self, commute_id: CommuteId) -> Result<Vec<Session>, StoreError>;

    /// Remove every session of a commute, keeping the commute. Returns how many went.
    fn clear_sessions(&mut self, commute_id: CommuteId) -> Result<usize, StoreError>;

    /// Statistics over the commute's valid sessions at `now`
    fn statistics(
        &self,
        commute_id: CommuteId,
        now: DateTime<Local>,
    ) -> Result<Statistics, StoreError> {
        self.commute(commute_id)?;
        let sessions = self.sessions_for(commute_id)?;
        Ok(Statistics::from_sessions(&sessions, now))
    }
}

impl<S: EntityStore + ?Sized> EntityStore for Box<S> {
    fn insert_commute(&mut self, commute: &Commute) -> Result<(), StoreError> {
        (**self).insert_commute(commute)
    }

    fn commute(&self, id: CommuteId) -> Result<Commute, StoreError> {
        (**self).commute(id)
    }

    fn commutes(&self) -> Result<Vec<Commute>, StoreError> {
        (**self).commutes()
    }

    fn delete_commute(&mut self, id: CommuteId) -> Result<(), StoreError> {
        (**self).delete_commute(id)
    }

    fn add_session(&mut self, session: &Session) -> Result<(), StoreError> {
        (**self).add_session(session)
    }

    fn delete_session(&mut self, id: SessionId) -> Result<(), StoreError> {
        (**self).delete_session(id)
    }

    fn sessions_for(&self, commute_id: CommuteId) -> Result<Vec<Session>, StoreError> {
        (**self).sessions_for(commute_id)
    }

    fn clear_sessions(&mut self, commute_id: CommuteId) -> Result<usize, StoreError> {
        (**self).clear_sessions(commute_id)
    }
}
