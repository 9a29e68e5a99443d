use crate::cache::{CacheData, CacheEntry, QueryStatus};
use shared::Error;
use std::time::Duration;

/// The (data, loading, error) triple a view renders from.
#[derive(Clone, Debug)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub error: Option<Error>,
    pub is_stale: bool,
}

impl<T: CacheData> QueryState<T> {
    pub fn from_entry(entry: CacheEntry, stale_time: Duration) -> Self {
        let is_stale = entry.is_stale(stale_time);
        Self {
            data: entry.data.and_then(T::from_cached),
            status: entry.status,
            error: entry.error,
            is_stale,
        }
    }
}

impl<T> QueryState<T> {
    /// State of a query that is switched off, e.g. a detail view without an id yet
    pub fn idle() -> Self {
        Self {
            data: None,
            status: QueryStatus::Idle,
            error: None,
            is_stale: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self.error, Some(Error::NotFound))
    }
}
