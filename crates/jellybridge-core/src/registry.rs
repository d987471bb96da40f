//! Active sessions keyed by file id

use crate::session::Session;
use std::collections::HashMap;

/// Mapping from playing file to its tracked session.
///
/// Keyed by file id, so at most one session exists per file.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `session` under `file_id`, returning any session it replaces
    pub fn put(&mut self, file_id: impl Into<String>, session: Session) -> Option<Session> {
        self.sessions.insert(file_id.into(), session)
    }

    pub fn get(&self, file_id: &str) -> Option<&Session> {
        self.sessions.get(file_id)
    }

    pub fn get_mut(&mut self, file_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(file_id)
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.sessions.contains_key(file_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn file_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop every tracked session
    pub fn clear_all(&mut self) {
        self.sessions.clear();
    }
}
