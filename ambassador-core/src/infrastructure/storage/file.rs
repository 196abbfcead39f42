use crate::domain::signing::SigningSession;
use crate::foundation::{Result, SessionId};
use crate::infrastructure::storage::{sort_sessions, SessionStore};
use crate::{serde_err, storage_err};
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const SESSION_FILE_EXT: &str = "json";

/// One pretty-printed JSON document per session, written via a temp file
/// and rename so a crash never leaves a half-written session behind.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|err| storage_err!("create sessions dir", err))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("{session_id}.{SESSION_FILE_EXT}"))
    }

    fn read_file(path: &Path) -> Result<Option<SigningSession>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(storage_err!("read session", err)),
        };
        serde_json::from_slice(&bytes).map(Some).map_err(|err| serde_err!("json", err))
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &SigningSession) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(session).map_err(|err| serde_err!("json", err))?;
        let path = self.path_for(&session.session_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|err| storage_err!("write session", err))?;
        fs::rename(&tmp, &path).map_err(|err| storage_err!("rename session", err))?;
        debug!("session saved session_id={} state={}", session.session_id, session.state);
        Ok(())
    }

    fn get(&self, session_id: &SessionId) -> Result<Option<SigningSession>> {
        Self::read_file(&self.path_for(session_id))
    }

    fn list(&self) -> Result<Vec<SigningSession>> {
        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|err| storage_err!("list sessions", err))? {
            let path = entry.map_err(|err| storage_err!("list sessions", err))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SESSION_FILE_EXT) {
                continue;
            }
            match Self::read_file(&path) {
                Ok(Some(session)) => sessions.push(session),
                Ok(None) => {}
                Err(err) => warn!("skipping unreadable session file path={} error={}", path.display(), err),
            }
        }
        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    fn delete(&self, session_id: &SessionId) -> Result<bool> {
        match fs::remove_file(self.path_for(session_id)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(storage_err!("delete session", err)),
        }
    }
}
