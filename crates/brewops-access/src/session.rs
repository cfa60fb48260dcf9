//! ---
//! brew_section: "06-security-access-control"
//! brew_subsection: "module"
//! brew_type: "source"
//! brew_scope: "code"
//! brew_description: "Injectable session store shared by guard and navigation."
//! brew_version: "v0.0.0-prealpha"
//! brew_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::actor::{Actor, SessionToken};

/// Snapshot of the session: token presence plus the actor record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<SessionToken>,
    #[serde(default)]
    pub actor: Option<Actor>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Session issued now for the given actor.
    pub fn signed_in(token: SessionToken, actor: Actor) -> Self {
        Self {
            token: Some(token),
            actor: Some(actor),
            issued_at: Some(Utc::now()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn actor(&self) -> Option<&Actor> {
        self.actor.as_ref()
    }

    pub fn token(&self) -> Option<&SessionToken> {
        self.token.as_ref()
    }
}

/// Errors returned by the session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The actor cannot be refreshed without an active session.
    #[error("no active session")]
    NotSignedIn,
    /// Reading or writing the session file failed.
    #[error("session file {path} unavailable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The session file does not hold a valid session document.
    #[error("session file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Process-wide session context. Clones share the same underlying session.
///
/// Every mutation replaces the whole [`Session`]; readers either take a
/// snapshot or subscribe to changes.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_session(Session::default())
    }
}

impl SessionStore {
    /// Store with no active session.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let (tx, _rx) = watch::channel(session);
        Self { tx: Arc::new(tx) }
    }

    /// Clone of the current session.
    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated()
    }

    /// Bearer token of the current session, if any.
    pub fn token(&self) -> Option<SessionToken> {
        self.tx.borrow().token.clone()
    }

    /// Receiver notified on every replacement of the session.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Start a new session, replacing any previous one.
    pub fn login(&self, token: SessionToken, actor: Actor) {
        info!(actor = %actor.id, "session established");
        self.tx.send_replace(Session::signed_in(token, actor));
    }

    /// Replace the actor record of the active session (profile refresh).
    pub fn refresh_actor(&self, actor: Actor) -> Result<(), SessionError> {
        let mut refreshed = false;
        self.tx.send_if_modified(|session| {
            if session.is_authenticated() {
                session.actor = Some(actor);
                refreshed = true;
            }
            refreshed
        });
        if refreshed {
            Ok(())
        } else {
            Err(SessionError::NotSignedIn)
        }
    }

    /// Drop the session (logout or expired credentials).
    ///
    /// Returns true when a token was present, i.e. this call ended a session.
    pub fn reset(&self) -> bool {
        let previous = self.tx.send_replace(Session::default());
        if let Some(actor) = previous.actor() {
            info!(actor = %actor.id, "session cleared");
        }
        previous.token().is_some()
    }

    /// Restore a store from a session file. A missing file yields an empty store.
    pub fn restore(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(session_file = %path.display(), "no persisted session found");
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let session: Session =
            serde_json::from_str(&raw).map_err(|source| SessionError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(
            session_file = %path.display(),
            authenticated = session.is_authenticated(),
            "persisted session restored"
        );
        Ok(Self::with_session(session))
    }

    /// Persist the current session as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        let serialised = serde_json::to_string_pretty(&self.snapshot()).map_err(|source| {
            SessionError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, serialised).map_err(|source| SessionError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::Grant;

    fn actor(name: &str) -> Actor {
        Actor::new(
            "u-9",
            name,
            "ops@cerveceria.invalid",
            vec![Grant::new("pedidos:read", "Comercial")],
        )
    }

    #[test]
    fn clones_share_state() {
        let store = SessionStore::new();
        let other = store.clone();
        store.login(SessionToken::new("abc"), actor("Ana"));
        assert!(other.is_authenticated());
        other.reset();
        assert!(!store.is_authenticated());
        assert!(store.snapshot().actor.is_none());
    }

    #[test]
    fn reset_reports_whether_a_session_ended() {
        let store = SessionStore::new();
        assert!(!store.reset());

        store.login(SessionToken::new("abc"), actor("Ana"));
        assert!(store.reset());
        assert!(!store.reset());
    }

    #[test]
    fn refresh_requires_session() {
        let store = SessionStore::new();
        assert!(matches!(
            store.refresh_actor(actor("Ana")),
            Err(SessionError::NotSignedIn)
        ));

        store.login(SessionToken::new("abc"), actor("Ana"));
        store.refresh_actor(actor("Ana María")).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.actor().unwrap().name, "Ana María");
        assert_eq!(snapshot.token().unwrap().as_str(), "abc");
    }

    #[tokio::test]
    async fn subscribers_observe_replacements() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();
        store.login(SessionToken::new("abc"), actor("Ana"));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_authenticated());

        store.reset();
        rx.changed().await.unwrap();
        assert!(!rx.borrow_and_update().is_authenticated());
    }

    #[test]
    fn save_and_restore_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("session.json");

        let store = SessionStore::new();
        store.login(SessionToken::new("abc"), actor("Ana"));
        store.save(&path).unwrap();

        let restored = SessionStore::restore(&path).unwrap();
        assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn restore_missing_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::restore(dir.path().join("absent.json")).unwrap();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn restore_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            SessionStore::restore(&path),
            Err(SessionError::Malformed { .. })
        ));
    }
}
