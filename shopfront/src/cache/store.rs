use crate::cache::entry::{CacheEntry, QueryStatus};
use crate::cache::value::CachedValue;
use crate::events::CacheEvent;
use crate::keys::QueryKey;
use dashmap::DashMap;
use shared::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Data of an entry as it was just before a patch, and the revision it was taken at.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub data: Option<CachedValue>,
    pub revision: u64,
}

/// Keyed store of cached query results.
///
/// Every operation is synchronous and total. Each write runs under the key's shard
/// lock, so a read-modify-write through [`EntryCache::patch`] cannot interleave with
/// another write to the same key. Entries live for the lifetime of the cache.
pub struct EntryCache {
    entries: DashMap<QueryKey, CacheEntry>,
    event_broadcaster: Option<broadcast::Sender<CacheEvent>>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            event_broadcaster: None,
        }
    }

    pub fn with_event_broadcaster(broadcaster: broadcast::Sender<CacheEvent>) -> Self {
        Self {
            entries: DashMap::new(),
            event_broadcaster: Some(broadcaster),
        }
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<CacheEvent>> {
        self.event_broadcaster.as_ref().map(|tx| tx.subscribe())
    }

    pub fn get(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.entries.get(key).map(|entry| entry.clone())
    }

    /// Snapshot of the entry, or a fresh idle entry when the key was never cached.
    pub fn snapshot(&self, key: &QueryKey) -> CacheEntry {
        self.get(key).unwrap_or_else(|| CacheEntry::new(*key))
    }

    /// Store fetched data: status becomes success, the error is cleared and the entry
    /// counts as fresh from now.
    pub fn set(&self, key: &QueryKey, data: CachedValue) {
        {
            let mut entry = self.entry_mut(key);
            entry.data = Some(data);
            entry.status = QueryStatus::Success;
            entry.error = None;
            entry.last_updated_at = Some(Instant::now());
            entry.failed_at = None;
            entry.invalidated = false;
            entry.revision += 1;
        }
        self.publish(CacheEvent::fetched(*key));
    }

    /// Change the status without touching data.
    ///
    /// `Error` records the given error. `Idle` and `Success` clear it. `Loading` keeps
    /// whatever error was there so a refetch after a failure still shows it.
    pub fn set_status(&self, key: &QueryKey, status: QueryStatus, error: Option<Error>) {
        let failure = {
            let mut entry = self.entry_mut(key);
            entry.status = status;
            match status {
                QueryStatus::Error => {
                    entry.error = error;
                    entry.failed_at = Some(Instant::now());
                    entry.error.clone()
                }
                QueryStatus::Idle | QueryStatus::Success => {
                    entry.error = None;
                    entry.failed_at = None;
                    None
                }
                QueryStatus::Loading => None,
            }
        };
        if let Some(err) = failure {
            self.publish(CacheEvent::fetch_failed(*key, &err));
        }
    }

    /// Apply a pure transformation to the entry's data and return the data as it was
    /// before the transformation.
    ///
    /// An absent entry (or one without data) starts from `default()`. `update` runs under
    /// the shard lock and must not touch the cache.
    pub fn patch<D, F>(&self, key: &QueryKey, default: D, update: F) -> Snapshot
    where
        D: FnOnce() -> CachedValue,
        F: FnOnce(CachedValue) -> CachedValue,
    {
        let previous = {
            let mut entry = self.entry_mut(key);
            let previous = entry.data.take();
            let current = previous.clone().unwrap_or_else(default);
            entry.data = Some(update(current));
            if entry.status == QueryStatus::Idle {
                entry.status = QueryStatus::Success;
            }
            Snapshot {
                data: previous,
                revision: entry.revision,
            }
        };
        self.publish(CacheEvent::patched(*key));
        previous
    }

    /// Replace the entry's data wholesale with a remembered snapshot. Restoring `None`
    /// clears the data and puts a success status back to idle.
    ///
    /// When fresh data was stored after the snapshot was taken, the restored value is
    /// older than what the server last said, so the entry is left stale.
    pub fn restore(&self, key: &QueryKey, snapshot: Snapshot) {
        {
            let mut entry = self.entry_mut(key);
            if snapshot.data.is_none() && entry.status == QueryStatus::Success {
                entry.status = QueryStatus::Idle;
            }
            if entry.revision != snapshot.revision {
                entry.invalidated = true;
            }
            entry.data = snapshot.data;
        }
        self.publish(CacheEvent::rolled_back(*key));
    }

    /// Mark an entry stale regardless of its age. Returns false when the key was never
    /// cached.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let existed = match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.invalidated = true;
                true
            }
            None => false,
        };
        if existed {
            self.publish(CacheEvent::invalidated(*key));
        }
        existed
    }

    /// First value produced by `f` over all entries, in no particular order.
    pub fn find_map<T>(&self, mut f: impl FnMut(&CacheEntry) -> Option<T>) -> Option<T> {
        self.entries.iter().find_map(|entry| f(entry.value()))
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.entries.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn publish(&self, event: CacheEvent) {
        if let Some(ref broadcaster) = self.event_broadcaster {
            let kind = event.kind();
            let key = *event.key();
            match broadcaster.send(event) {
                Ok(subscriber_count) => {
                    tracing::trace!(
                        "Broadcasted {} event for '{}' to {} subscriber(s)",
                        kind,
                        key,
                        subscriber_count
                    );
                }
                Err(_) => {
                    tracing::trace!("No subscribers for {} event on '{}'", kind, key);
                }
            }
        }
    }

    fn entry_mut(&self, key: &QueryKey) -> dashmap::mapref::one::RefMut<'_, QueryKey, CacheEntry> {
        self.entries
            .entry(*key)
            .or_insert_with(|| CacheEntry::new(*key))
    }
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryCache")
            .field("entry_count", &self.entries.len())
            .field("broadcasting", &self.event_broadcaster.is_some())
            .finish()
    }
}
