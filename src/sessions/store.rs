//! Login session store.
//!
//! Maps session cookies to the user they authenticate. Cookie values are
//! random 32-byte secrets; the store keys sessions by their SHA-256 digest
//! so a dump of the map does not leak usable cookies.

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tokio::time;

use crate::clock::now_unix;

type CookieDigest = [u8; 32];

fn digest(cookie: &str) -> CookieDigest {
    Sha256::digest(cookie.as_bytes()).into()
}

fn random_token(len: usize) -> String {
    let mut raw = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut raw);
    URL_SAFE_NO_PAD.encode(raw)
}

/// One authenticated browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: String,
    /// Non-secret identifier, safe to log and to bind XSRF tokens to.
    pub session_id: String,
    /// Instance the cookie was issued for; `None` means Hub-wide.
    pub server: Option<String>,
    pub created_at: u64,
    pub expires_at: u64,
}

impl Session {
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<CookieDigest, Session>,
    max_age_secs: u64,
}

impl SessionStore {
    pub fn new(max_age_secs: u64) -> Self {
        Self {
            sessions: DashMap::new(),
            max_age_secs,
        }
    }

    pub fn max_age_secs(&self) -> u64 {
        self.max_age_secs
    }

    /// Start a session; returns the cookie value and the session.
    pub fn create(&self, user: &str, server: Option<&str>) -> (String, Session) {
        let cookie = random_token(32);
        let now = now_unix();
        let session = Session {
            user: user.to_string(),
            session_id: random_token(12),
            server: server.map(String::from),
            created_at: now,
            expires_at: now.saturating_add(self.max_age_secs),
        };
        self.sessions.insert(digest(&cookie), session.clone());
        tracing::info!(user = %user, session_id = %session.session_id, server = ?server, "Session created");
        (cookie, session)
    }

    /// Session for `cookie` if it exists and has not expired. Expired
    /// sessions are dropped on sight.
    pub fn lookup(&self, cookie: &str) -> Option<Session> {
        self.lookup_at(cookie, now_unix())
    }

    pub fn lookup_at(&self, cookie: &str, now: u64) -> Option<Session> {
        let key = digest(cookie);
        let session = self.sessions.get(&key).map(|s| s.value().clone())?;
        if session.is_expired_at(now) {
            self.sessions.remove_if(&key, |_, s| s.is_expired_at(now));
            return None;
        }
        Some(session)
    }

    /// End the session for `cookie`.
    pub fn remove(&self, cookie: &str) -> Option<Session> {
        self.sessions.remove(&digest(cookie)).map(|(_, s)| s)
    }

    /// End every session of `user`. Returns how many were removed.
    pub fn remove_user(&self, user: &str) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.user != user);
        before.saturating_sub(self.sessions.len())
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn purge_expired(&self, now: u64) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.is_expired_at(now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Periodically purge expired sessions until shutdown.
pub async fn run_cleanup(store: Arc<SessionStore>, interval_secs: u64, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let purged = store.purge_expired(now_unix());
                if purged > 0 {
                    tracing::debug!(purged, remaining = store.len(), "Purged expired sessions");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Session cleanup received shutdown signal, exiting loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_lookup_remove() {
        let store = SessionStore::new(3600);
        let (cookie, session) = store.create("alice", None);
        assert_eq!(store.lookup(&cookie), Some(session.clone()));
        assert_eq!(store.lookup("not-a-cookie"), None);
        assert_eq!(store.remove(&cookie), Some(session));
        assert_eq!(store.lookup(&cookie), None);
    }

    #[test]
    fn test_expiry() {
        let store = SessionStore::new(60);
        let (cookie, session) = store.create("alice", Some("alice-server"));
        assert!(store.lookup_at(&cookie, session.expires_at - 1).is_some());
        assert!(store.lookup_at(&cookie, session.expires_at).is_none());
        // Dropped on sight.
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_and_remove_user() {
        let store = SessionStore::new(60);
        let (_, s) = store.create("alice", None);
        store.create("alice", None);
        store.create("bob", None);
        assert_eq!(store.remove_user("alice"), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.purge_expired(s.expires_at + 1), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_cookies_are_unique() {
        let store = SessionStore::new(60);
        let (a, sa) = store.create("alice", None);
        let (b, sb) = store.create("alice", None);
        assert_ne!(a, b);
        assert_ne!(sa.session_id, sb.session_id);
    }
}
