//! Registered sessions, addressed by external id.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use arcade_core::{Session, Store};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// A registered session and when it was last used.
#[derive(Debug)]
pub struct SessionEntry<'s> {
    session: Mutex<Session<'s>>,
    last_used: Mutex<Instant>,
}

impl<'s> SessionEntry<'s> {
    /// Locks the session for one operation.
    ///
    /// Requests for the same session are serialized here.
    pub fn lock(&self) -> MutexGuard<'_, Session<'s>> {
        *self.last_used.lock() = Instant::now();
        self.session.lock()
    }

    fn idle_since(&self) -> Instant {
        *self.last_used.lock()
    }
}

/// Maps session ids to sessions of one store.
///
/// Sessions live until closed or, with a TTL configured, until they sit
/// idle longer than the TTL and [`SessionRegistry::evict_expired`] runs.
#[derive(Debug)]
pub struct SessionRegistry<'s> {
    store: &'s Store,
    config: ServerConfig,
    sessions: RwLock<HashMap<String, Arc<SessionEntry<'s>>>>,
}

impl<'s> SessionRegistry<'s> {
    /// Creates an empty registry over `store`.
    pub fn new(store: &'s Store, config: ServerConfig) -> Self {
        Self {
            store,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a new autocommit session and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `TooManySessions` if the registry is full after evicting
    /// expired sessions.
    pub fn create(&self) -> ServerResult<String> {
        self.evict_expired();

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.config.max_sessions {
            return Err(ServerError::TooManySessions {
                limit: self.config.max_sessions,
            });
        }

        let id = Uuid::new_v4().to_string();
        let entry = SessionEntry {
            session: Mutex::new(self.store.new_session().with_origin(id.clone())),
            last_used: Mutex::new(Instant::now()),
        };
        sessions.insert(id.clone(), Arc::new(entry));
        tracing::debug!(session = %id, "session created");
        Ok(id)
    }

    /// Looks up a session.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` if the id is not registered.
    pub fn get(&self, id: &str) -> ServerResult<Arc<SessionEntry<'s>>> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| ServerError::UnknownSession(id.to_string()))
    }

    /// Removes a session, discarding any open transaction layers.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSession` if the id is not registered.
    pub fn close(&self, id: &str) -> ServerResult<()> {
        let entry = self
            .sessions
            .write()
            .remove(id)
            .ok_or_else(|| ServerError::UnknownSession(id.to_string()))?;

        let depth = entry.lock().depth();
        tracing::debug!(session = %id, depth, "session closed");
        Ok(())
    }

    /// Evicts sessions idle longer than the TTL. Returns how many went.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    /// Evicts sessions idle longer than the TTL as of `now`.
    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let Some(ttl) = self.config.session_ttl else {
            return 0;
        };

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.idle_since()) <= ttl);
        let evicted = before - sessions.len();

        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    /// Returns the number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn create_get_close() {
        let store = Store::open_in_memory().unwrap();
        let registry = SessionRegistry::new(&store, ServerConfig::default());

        let id = registry.create().unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        registry.get(&id).unwrap().lock().begin();
        assert_eq!(registry.get(&id).unwrap().lock().depth(), 1);

        registry.close(&id).unwrap();
        assert!(matches!(registry.get(&id), Err(ServerError::UnknownSession(_))));
        assert!(registry.close(&id).is_err());
    }

    #[test]
    fn sessions_are_independent() {
        let store = Store::open_in_memory().unwrap();
        let registry = SessionRegistry::new(&store, ServerConfig::default());
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        assert_ne!(a, b);

        registry.get(&a).unwrap().lock().begin();
        assert_eq!(registry.get(&b).unwrap().lock().depth(), 0);
    }

    #[test]
    fn idle_sessions_expire() {
        let store = Store::open_in_memory().unwrap();
        let config = ServerConfig::new().with_session_ttl(Duration::from_secs(60));
        let registry = SessionRegistry::new(&store, config);
        let id = registry.create().unwrap();

        assert_eq!(registry.evict_expired_at(Instant::now()), 0);
        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(registry.evict_expired_at(later), 1);
        assert!(registry.get(&id).is_err());
    }

    #[test]
    fn no_ttl_keeps_sessions() {
        let store = Store::open_in_memory().unwrap();
        let registry = SessionRegistry::new(&store, ServerConfig::new().without_session_ttl());
        registry.create().unwrap();
        let much_later = Instant::now() + Duration::from_secs(86_400);
        assert_eq!(registry.evict_expired_at(much_later), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_is_capped() {
        let store = Store::open_in_memory().unwrap();
        let registry = SessionRegistry::new(&store, ServerConfig::new().with_max_sessions(2));
        registry.create().unwrap();
        let second = registry.create().unwrap();
        assert!(matches!(
            registry.create(),
            Err(ServerError::TooManySessions { limit: 2 })
        ));

        registry.close(&second).unwrap();
        assert!(registry.create().is_ok());
    }
}
