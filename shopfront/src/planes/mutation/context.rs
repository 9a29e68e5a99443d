use crate::cache::{CachedValue, EntryCache, Snapshot};
use crate::keys::QueryKey;

/// Value of one cache entry captured at the moment an optimistic patch was applied.
///
/// Lives for exactly one in-flight mutation. [`MutationContext::restore`] puts the
/// captured value back wholesale; dropping the context discards it.
#[derive(Debug)]
pub struct MutationContext {
    key: QueryKey,
    snapshot: Snapshot,
}

impl MutationContext {
    /// Patch `key` and capture its prior data in one step under the entry's lock.
    pub fn apply<D, F>(cache: &EntryCache, key: QueryKey, default: D, update: F) -> Self
    where
        D: FnOnce() -> CachedValue,
        F: FnOnce(CachedValue) -> CachedValue,
    {
        let snapshot = cache.patch(&key, default, update);
        Self { key, snapshot }
    }

    pub fn snapshot(&self) -> Option<&CachedValue> {
        self.snapshot.data.as_ref()
    }

    pub fn restore(self, cache: &EntryCache) {
        tracing::debug!("Restoring '{}' to its pre-mutation snapshot", self.key);
        cache.restore(&self.key, self.snapshot);
    }
}
