//! Persists the signed-in session between invocations.

use pantrack_core::Session;
use std::fs;
use std::io;
use std::path::PathBuf;

/// `session.json` in the data directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the stored session, if there is one.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| SessionError::ReadError(self.path.clone(), e))?;
        let session = serde_json::from_str(&contents)
            .map_err(|e| SessionError::ParseError(self.path.clone(), e))?;
        Ok(Some(session))
    }

    /// The stored session, failing if there is none or it has expired.
    pub fn require(&self) -> Result<Session, SessionError> {
        match self.load()? {
            Some(session) if session.is_expired() => Err(SessionError::Expired),
            Some(session) => Ok(session),
            None => Err(SessionError::NotLoggedIn),
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SessionError::WriteError(self.path.clone(), e))?;
        }
        let json = serde_json::to_string_pretty(session)
            .map_err(|e| SessionError::ParseError(self.path.clone(), e))?;
        fs::write(&self.path, json).map_err(|e| SessionError::WriteError(self.path.clone(), e))?;
        Ok(())
    }

    /// Removes the stored session. Returns false if there was none.
    pub fn clear(&self) -> Result<bool, SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SessionError::WriteError(self.path.clone(), e)),
        }
    }
}

#[derive(Debug)]
pub enum SessionError {
    ReadError(PathBuf, io::Error),
    WriteError(PathBuf, io::Error),
    ParseError(PathBuf, serde_json::Error),
    NotLoggedIn,
    Expired,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::ReadError(path, e) => {
                write!(f, "Failed to read session file '{}': {}", path.display(), e)
            }
            SessionError::WriteError(path, e) => {
                write!(f, "Failed to write session file '{}': {}", path.display(), e)
            }
            SessionError::ParseError(path, e) => {
                write!(f, "Invalid session file '{}': {}", path.display(), e)
            }
            SessionError::NotLoggedIn => {
                write!(f, "Not logged in. Run 'pantrack login' first.")
            }
            SessionError::Expired => {
                write!(f, "Session expired. Run 'pantrack login' again.")
            }
        }
    }
}

impl std::error::Error for SessionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn session(expires_in: i64) -> Session {
        Session {
            access_token: "jwt".to_string(),
            refresh_token: "refresh".to_string(),
            user_id: "u1".to_string(),
            email: Some("cook@example.com".to_string()),
            expires_at: Some(Utc::now() + Duration::seconds(expires_in)),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let store = SessionStore::new(temp_dir.path().join("nested").join("session.json"));

        assert!(store.load().unwrap().is_none());
        store.save(&session(3600)).unwrap();

        let loaded = store.require().unwrap();
        assert_eq!(loaded.user_id, "u1");
        assert_eq!(loaded.email.as_deref(), Some("cook@example.com"));
    }

    #[test]
    fn test_require_without_session() {
        let temp_dir = tempdir().unwrap();
        let store = SessionStore::new(temp_dir.path().join("session.json"));

        let err = store.require().unwrap_err();
        assert!(matches!(err, SessionError::NotLoggedIn));
        assert!(err.to_string().contains("Not logged in"));
    }

    #[test]
    fn test_require_expired_session() {
        let temp_dir = tempdir().unwrap();
        let store = SessionStore::new(temp_dir.path().join("session.json"));
        store.save(&session(-60)).unwrap();

        assert!(matches!(store.require(), Err(SessionError::Expired)));
    }

    #[test]
    fn test_clear() {
        let temp_dir = tempdir().unwrap();
        let store = SessionStore::new(temp_dir.path().join("session.json"));

        assert!(!store.clear().unwrap());
        store.save(&session(3600)).unwrap();
        assert!(store.clear().unwrap());
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_session_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = SessionStore::new(path).load().unwrap_err();
        assert!(err.to_string().contains("Invalid session file"));
    }
}
