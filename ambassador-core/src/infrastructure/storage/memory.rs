use crate::domain::signing::SigningSession;
use crate::foundation::{AmbassadorError, Result, SessionId};
use crate::infrastructure::storage::{sort_sessions, SessionStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<HashMap<SessionId, SigningSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, HashMap<SessionId, SigningSession>>> {
        self.inner.lock().map_err(|_| AmbassadorError::StorageError {
            operation: "memory session store lock".to_string(),
            details: "poisoned".to_string(),
        })
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &SigningSession) -> Result<()> {
        self.lock_inner()?.insert(session.session_id, session.clone());
        Ok(())
    }

    fn get(&self, session_id: &SessionId) -> Result<Option<SigningSession>> {
        Ok(self.lock_inner()?.get(session_id).cloned())
    }

    fn list(&self) -> Result<Vec<SigningSession>> {
        let mut sessions = self.lock_inner()?.values().cloned().collect::<Vec<_>>();
        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    fn delete(&self, session_id: &SessionId) -> Result<bool> {
        Ok(self.lock_inner()?.remove(session_id).is_some())
    }
}
