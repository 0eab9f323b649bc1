use std::collections::HashMap;
use std::sync::RwLock;

use base64::engine::{general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use common::SessionUser;
use rand::RngCore;

#[derive(Clone, Debug)]
struct Session {
    user: SessionUser,
    expires_at: DateTime<Utc>,
}

/// In-memory store mapping opaque tokens to logged-in users.
///
/// Sessions are deliberately not persisted: a process restart logs
/// everyone out. The map is shared by every in-flight request, so all
/// access goes through the `RwLock`.
#[derive(Debug)]
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Issues a fresh token for `user`, valid for the configured TTL.
    pub fn create(&self, user: SessionUser) -> String {
        let mut token_bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut token_bytes);
        let token = general_purpose::URL_SAFE_NO_PAD.encode(token_bytes);

        let session = Session {
            user,
            expires_at: Utc::now() + self.ttl,
        };
        self.sessions
            .write()
            .expect("session lock poisoned")
            .insert(token.clone(), session);

        token
    }

    /// Looks up a token, returning the user only while the session is
    /// alive. Expired entries are dropped on the spot.
    pub fn resolve(&self, token: &str) -> Option<SessionUser> {
        // The common case is a live session; keep it on the read lock so
        // concurrent resolutions don't serialize.
        {
            let sessions = self.sessions.read().expect("session lock poisoned");
            match sessions.get(token) {
                Some(session) if session.expires_at > Utc::now() => {
                    return Some(session.user.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: re-check under the write lock before evicting.
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        if sessions
            .get(token)
            .is_some_and(|session| session.expires_at <= Utc::now())
        {
            sessions.remove(token);
        }
        None
    }

    /// Removes a session. Destroying an unknown token is not an error.
    pub fn destroy(&self, token: &str) {
        self.sessions
            .write()
            .expect("session lock poisoned")
            .remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64) -> SessionUser {
        SessionUser {
            id,
            username: format!("user{id}"),
        }
    }

    #[test]
    fn create_then_resolve_returns_user() {
        let store = SessionStore::new(Duration::hours(24));
        let token = store.create(user(1));
        assert_eq!(store.resolve(&token), Some(user(1)));
        // Resolving a live session must not consume it.
        assert_eq!(store.resolve(&token), Some(user(1)));
    }

    #[test]
    fn tokens_are_unique_per_session() {
        let store = SessionStore::new(Duration::hours(24));
        let a = store.create(user(1));
        let b = store.create(user(1));
        assert_ne!(a, b);
        // Both sessions for the same user stay valid independently.
        store.destroy(&a);
        assert_eq!(store.resolve(&a), None);
        assert_eq!(store.resolve(&b), Some(user(1)));
    }

    #[test]
    fn destroy_is_idempotent() {
        let store = SessionStore::new(Duration::hours(24));
        let token = store.create(user(7));
        store.destroy(&token);
        store.destroy(&token);
        store.destroy("never-issued");
        assert_eq!(store.resolve(&token), None);
    }

    #[test]
    fn expired_session_does_not_resolve() {
        // A negative TTL makes every session born expired.
        let store = SessionStore::new(Duration::seconds(-1));
        let token = store.create(user(3));
        assert_eq!(store.resolve(&token), None);
        // The expired entry was evicted, not just hidden.
        assert!(store
            .sessions
            .read()
            .expect("session lock poisoned")
            .is_empty());
    }

    #[test]
    fn unknown_token_does_not_resolve() {
        let store = SessionStore::new(Duration::hours(24));
        assert_eq!(store.resolve("no-such-token"), None);
    }
}
