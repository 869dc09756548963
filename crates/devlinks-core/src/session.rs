//! Session persistence
//!
//! Keeps the signed-in session between CLI invocations so every command
//! does not have to sign in again.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::AuthUser;

/// Seconds before the real expiry at which a session counts as expired
const EXPIRY_SKEW_SECS: i64 = 60;

/// An authenticated session as issued by the auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which the access token expires
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token is expired (or about to be) at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() + EXPIRY_SKEW_SECS >= self.expires_at
    }
}

/// File-backed storage for the current session
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the stored session, if any
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {:?}", self.path))?;
        let session = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse session file: {:?}", self.path))?;
        Ok(Some(session))
    }

    /// Save the session, replacing any previous one
    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json).context("Failed to save session")?;
        restrict_permissions(&self.path);
        Ok(())
    }

    /// Forget the stored session
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove session file: {:?}", self.path))?;
        }
        Ok(())
    }
}

/// Tokens are credentials; keep the file private to the user
#[cfg(unix)]
fn restrict_permissions(path: &PathBuf) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Could not restrict permissions on {:?}: {}", path, e);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &PathBuf) {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_session(expires_at: i64) -> Session {
        Session {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at,
            user: AuthUser {
                id: Uuid::new_v4(),
                email: Some("alex@email.com".to_string()),
            },
        }
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        assert!(!sample_session(now.timestamp() + 3600).is_expired(now));
        assert!(sample_session(now.timestamp() + 30).is_expired(now));
        assert!(sample_session(now.timestamp() - 10).is_expired(now));
    }

    #[test]
    fn test_session_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().join("nested").join("session.json"));

        assert!(store.load().unwrap().is_none());

        let session = sample_session(1_900_000_000);
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_session_store_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        let store = SessionStore::new(path);
        assert!(store.load().is_err());
    }
}
