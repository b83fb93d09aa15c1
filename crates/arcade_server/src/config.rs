//! Server configuration.

use std::time::Duration;

/// Configuration for the request server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Idle time after which a registered session may be evicted.
    ///
    /// `None` keeps sessions until they are closed.
    pub session_ttl: Option<Duration>,
    /// Maximum number of registered sessions.
    pub max_sessions: usize,
}

impl ServerConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self {
            session_ttl: Some(Duration::from_secs(30 * 60)),
            max_sessions: 10_000,
        }
    }

    /// Sets the idle session time-to-live.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    /// Keeps sessions until explicitly closed.
    pub fn without_session_ttl(mut self) -> Self {
        self.session_ttl = None;
        self
    }

    /// Sets the maximum number of registered sessions.
    pub fn with_max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.session_ttl, Some(Duration::from_secs(1800)));
        assert_eq!(config.max_sessions, 10_000);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new()
            .with_session_ttl(Duration::from_secs(5))
            .with_max_sessions(3);
        assert_eq!(config.session_ttl, Some(Duration::from_secs(5)));
        assert_eq!(config.max_sessions, 3);

        assert!(config.without_session_ttl().session_ttl.is_none());
    }
}
