//! Persistence for signing sessions.

mod file;
mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

use crate::domain::signing::SigningSession;
use crate::foundation::{Result, SessionId};

pub trait SessionStore: Send + Sync {
    /// Inserts or replaces the session under its id.
    fn save(&self, session: &SigningSession) -> Result<()>;
    fn get(&self, session_id: &SessionId) -> Result<Option<SigningSession>>;
    /// Sessions ordered by creation time.
    fn list(&self) -> Result<Vec<SigningSession>>;
    /// Returns `Ok(false)` if the session did not exist.
    fn delete(&self, session_id: &SessionId) -> Result<bool>;

    fn list_open(&self) -> Result<Vec<SigningSession>> {
        Ok(self.list()?.into_iter().filter(|session| !session.is_terminal()).collect())
    }
}

fn sort_sessions(sessions: &mut [SigningSession]) {
    sessions.sort_by(|a, b| a.created_at_nanos.cmp(&b.created_at_nanos).then_with(|| a.session_id.cmp(&b.session_id)));
}
