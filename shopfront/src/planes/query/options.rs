use shared::config::Config;
use std::time::Duration;

/// Per-query behaviour. `Default` gives a five minute freshness window and one retry
/// after a one second pause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    pub enabled: bool,
    pub stale_time: Duration,
    pub retry: bool,
    pub retry_delay: Duration,
}

impl QueryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_time: config.stale_time,
            retry_delay: config.retry_delay,
            ..Self::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_time: Duration::from_secs(300),
            retry: true,
            retry_delay: Duration::from_secs(1),
        }
    }
}
