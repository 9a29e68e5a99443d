use crate::cache::value::CachedValue;
use crate::keys::QueryKey;
use serde::Serialize;
use shared::Error;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Stored result and status for one query key. Callers only ever see clones.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub data: Option<CachedValue>,
    pub status: QueryStatus,
    pub error: Option<Error>,
    pub last_updated_at: Option<Instant>,
    /// When the current error was recorded
    pub failed_at: Option<Instant>,
    pub invalidated: bool,
    /// Bumped by every store of fetched or accepted data
    pub revision: u64,
}

impl CacheEntry {
    pub fn new(key: QueryKey) -> Self {
        Self {
            key,
            data: None,
            status: QueryStatus::Idle,
            error: None,
            last_updated_at: None,
            failed_at: None,
            invalidated: false,
            revision: 0,
        }
    }

    /// Stale when never fetched, explicitly invalidated, or older than `stale_time`.
    ///
    /// A terminal failure (not found, undecodable) counts as an answer, so it holds off
    /// refetching for the same window as data does.
    pub fn is_stale(&self, stale_time: Duration) -> bool {
        if self.invalidated {
            return true;
        }
        let terminal_at = self
            .error
            .as_ref()
            .filter(|err| !err.is_retryable())
            .and(self.failed_at);
        match self.last_updated_at.max(terminal_at) {
            Some(settled) => settled.elapsed() >= stale_time,
            None => true,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }
}
