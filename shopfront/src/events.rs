use crate::keys::QueryKey;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Change notifications published by the entry cache. Views subscribe to learn when
/// a key they display needs re-reading.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CacheEvent {
    Fetched(KeyEvent),
    FetchFailed(FetchFailedEvent),
    Patched(KeyEvent),
    RolledBack(KeyEvent),
    Invalidated(KeyEvent),
    StaleDiscarded(StaleDiscardedEvent),
}

impl CacheEvent {
    pub fn key(&self) -> &QueryKey {
        match self {
            CacheEvent::Fetched(e)
            | CacheEvent::Patched(e)
            | CacheEvent::RolledBack(e)
            | CacheEvent::Invalidated(e) => &e.key,
            CacheEvent::FetchFailed(e) => &e.key,
            CacheEvent::StaleDiscarded(e) => &e.key,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CacheEvent::Fetched(_) => "fetched",
            CacheEvent::FetchFailed(_) => "fetch_failed",
            CacheEvent::Patched(_) => "patched",
            CacheEvent::RolledBack(_) => "rolled_back",
            CacheEvent::Invalidated(_) => "invalidated",
            CacheEvent::StaleDiscarded(_) => "stale_discarded",
        }
    }

    pub(crate) fn fetched(key: QueryKey) -> Self {
        CacheEvent::Fetched(KeyEvent::now(key))
    }

    pub(crate) fn patched(key: QueryKey) -> Self {
        CacheEvent::Patched(KeyEvent::now(key))
    }

    pub(crate) fn rolled_back(key: QueryKey) -> Self {
        CacheEvent::RolledBack(KeyEvent::now(key))
    }

    pub(crate) fn invalidated(key: QueryKey) -> Self {
        CacheEvent::Invalidated(KeyEvent::now(key))
    }

    pub(crate) fn fetch_failed(key: QueryKey, error: &shared::Error) -> Self {
        CacheEvent::FetchFailed(FetchFailedEvent {
            key,
            error: error.to_string(),
            timestamp: Utc::now(),
        })
    }

    pub(crate) fn stale_discarded(key: QueryKey, generation: u64) -> Self {
        CacheEvent::StaleDiscarded(StaleDiscardedEvent {
            key,
            generation,
            timestamp: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyEvent {
    pub key: QueryKey,
    pub timestamp: DateTime<Utc>,
}

impl KeyEvent {
    fn now(key: QueryKey) -> Self {
        Self {
            key,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchFailedEvent {
    pub key: QueryKey,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaleDiscardedEvent {
    pub key: QueryKey,
    pub generation: u64,
    pub timestamp: DateTime<Utc>,
}
