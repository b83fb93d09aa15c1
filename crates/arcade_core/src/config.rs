//! Store configuration.

use std::time::Duration;

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the store directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to error if the store already exists.
    pub error_if_exists: bool,

    /// Maximum time a writer waits for the writer lock before failing.
    pub busy_timeout: Duration,

    /// Whether to sync the table file after every applied frame.
    ///
    /// When false, frames are flushed to the OS but not forced to disk.
    pub sync_on_commit: bool,

    /// Maximum number of idle connections kept by the pool.
    pub max_idle_connections: usize,

    /// Whether flushes are recorded in the commit log.
    pub commit_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            busy_timeout: Duration::from_secs(3),
            sync_on_commit: false,
            max_idle_connections: 16,
            commit_log: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the store if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if the store exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets the writer lock wait bound.
    #[must_use]
    pub const fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Sets whether to sync the table on every applied frame.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the idle connection cap of the pool.
    #[must_use]
    pub const fn max_idle_connections(mut self, max: usize) -> Self {
        self.max_idle_connections = max;
        self
    }

    /// Enables or disables the commit log.
    #[must_use]
    pub const fn commit_log(mut self, value: bool) -> Self {
        self.commit_log = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(!config.error_if_exists);
        assert_eq!(config.busy_timeout, Duration::from_secs(3));
        assert!(config.commit_log);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_commit(true)
            .busy_timeout(Duration::from_millis(50))
            .max_idle_connections(2);

        assert!(!config.create_if_missing);
        assert!(config.sync_on_commit);
        assert_eq!(config.busy_timeout, Duration::from_millis(50));
        assert_eq!(config.max_idle_connections, 2);
    }
}
