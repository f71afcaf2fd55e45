//! On-disk session persistence.
//!
//! `login` writes the token plus the signed-in user to a JSON file under the
//! user's home directory; every later invocation reads it back, and `logout`
//! deletes it. The server stays the source of truth for token validity, so a
//! stale file simply produces a 401 on the next request.

use crate::models::User;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A signed-in identity: the bearer token and the user it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

/// Reads and writes the session file.
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the saved session, if any. A corrupt file counts as signed out
    /// rather than an error; the next `login` overwrites it.
    pub fn load(&self) -> Result<Option<Session>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read session file: {}", self.path.display())
                })
            }
        };
        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                tracing::warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.path.display(),
                    err
                );
                Ok(None)
            }
        }
    }

    /// Load the session or fail with a sign-in hint.
    pub fn require(&self) -> Result<Session> {
        self.load()?
            .ok_or_else(|| anyhow::anyhow!("not signed in; run `tawseel login` first"))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }
        let content =
            serde_json::to_string_pretty(session).context("Failed to encode session")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;

        // The file holds a bearer token; keep it readable by the owner only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// Forget the session. A missing file is fine: logout is idempotent.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove session file: {}", self.path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn sample_session() -> Session {
        Session {
            token: "tok-123".to_string(),
            user: User {
                id: 1,
                username: "admin".to_string(),
                full_name: "Admin".to_string(),
                role: Role::Admin,
                phone: None,
                is_active: true,
            },
        }
    }

    fn store_in(dir: &tempfile::TempDir) -> SessionStore {
        SessionStore::new(dir.path().join("session.json"))
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample_session()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.token, "tok-123");
        assert_eq!(loaded.user.username, "admin");
        assert_eq!(loaded.user.role, Role::Admin);
    }

    #[test]
    fn test_missing_file_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.load().unwrap().is_none());
        assert!(store.require().is_err());
    }

    #[test]
    fn test_corrupt_file_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample_session()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join(".tawseel").join("session.json"));
        store.save(&sample_session()).unwrap();
        assert!(store.load().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&sample_session()).unwrap();
        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
