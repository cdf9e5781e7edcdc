use super::EntityStore;
use crate::error::StoreError;
use crate::model::{Commute, CommuteId, Session, SessionId};
use itertools::Itertools;
use std::collections::HashMap;

/// Id-keyed arenas held in memory; nothing survives the process
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    commutes: HashMap<CommuteId, Commute>,
    sessions: HashMap<SessionId, Session>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
    fn insert_commute(&mut self, commute: &Commute) -> Result<(), StoreError> {
        if self.commutes.contains_key(&commute.id) {
            return Err(StoreError::Persistence(format!(
                "commute {} already exists",
                commute.id
            )));
        }
        self.commutes.insert(commute.id, commute.clone());
        Ok(())
    }

    fn commute(&self, id: CommuteId) -> Result<Commute, StoreError> {
        self.commutes
            .get(&id)
            .cloned()
            .ok_or(StoreError::CommuteNotFound(id))
    }

    fn commutes(&self) -> Result<Vec<Commute>, StoreError> {
        Ok(self
            .commutes
            .values()
            .cloned()
            .sorted_by_key(|c| c.name.to_lowercase())
            .collect())
    }

    fn delete_commute(&mut self, id: CommuteId) -> Result<(), StoreError> {
        if self.commutes.remove(&id).is_none() {
            return Err(StoreError::CommuteNotFound(id));
        }
        self.sessions.retain(|_, s| s.commute_id != id);
        Ok(())
    }

    fn add_session(&mut self, session: &Session) -> Result<(), StoreError> {
        if !self.commutes.contains_key(&session.commute_id) {
            return Err(StoreError::CommuteNotFound(session.commute_id));
        }
        if self.sessions.contains_key(&session.id) {
            return Err(StoreError::Persistence(format!(
                "session {} already exists",
                session.id
            )));
        }
        self.sessions.insert(session.id, session.clone());
        Ok(())
    }

    fn delete_session(&mut self, id: SessionId) -> Result<(), StoreError> {
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::SessionNotFound(id))
    }

    fn sessions_for(&self, commute_id: CommuteId) -> Result<Vec<Session>, StoreError> {
        Ok(self
            .sessions
            .values()
            .filter(|s| s.commute_id == commute_id)
            .cloned()
            .sorted_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)))
            .collect())
    }

    fn clear_sessions(&mut self, commute_id: CommuteId) -> Result<usize, StoreError> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.commute_id != commute_id);
        Ok(before - self.sessions.len())
    }
}
