use crate::cache::{CacheEntry, CachedValue, EntryCache, QueryStatus};
use crate::events::CacheEvent;
use crate::keys::QueryKey;
use crate::planes::query::fetchers::FetchFn;
use crate::planes::query::options::QueryOptions;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use shared::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue>>>;

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

/// Fetch bookkeeping for one key. `latest` is the generation of the most recently
/// started fetch; a result from any other generation is discarded on arrival. While
/// `writers` is non-zero no fetch for the key may start.
#[derive(Default)]
struct KeyState {
    latest: u64,
    in_flight: Option<InFlight>,
    writers: usize,
}

type Registry = Arc<Mutex<HashMap<QueryKey, KeyState>>>;

enum Ensured {
    Fresh,
    Held,
    Joined(SharedFetch),
    Started(SharedFetch),
}

impl Ensured {
    fn into_fetch(self) -> Option<SharedFetch> {
        match self {
            Ensured::Fresh | Ensured::Held => None,
            Ensured::Joined(fetch) | Ensured::Started(fetch) => Some(fetch),
        }
    }
}

/// Resolves query keys against the entry cache, fetching through the supplied
/// [`FetchFn`] when an entry is absent or stale.
///
/// At most one fetch per key is outstanding; callers arriving while it runs share
/// its result. Fetches run as spawned tasks, so every method that may start one must
/// be called from within a Tokio runtime. The registry lock is never held across an
/// await and is always taken before a cache shard lock.
pub struct QueryCoordinator {
    cache: Arc<EntryCache>,
    registry: Registry,
}

impl QueryCoordinator {
    pub fn new(cache: Arc<EntryCache>) -> Self {
        Self {
            cache,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Current entry for `key`, starting a background fetch when it is absent or stale
    /// and none is running. A disabled query never fetches.
    pub fn query(&self, key: &QueryKey, fetch: FetchFn, options: &QueryOptions) -> CacheEntry {
        if options.enabled {
            self.ensure(key, fetch, options);
        }
        self.cache.snapshot(key)
    }

    /// Like [`QueryCoordinator::query`] but waits for the fetch, including any newer
    /// fetch that superseded it, to settle.
    pub async fn fetch(&self, key: &QueryKey, fetch: FetchFn, options: &QueryOptions) -> CacheEntry {
        if !options.enabled {
            return self.cache.snapshot(key);
        }
        let mut pending = self.ensure(key, fetch, options).into_fetch();
        while let Some(fetch) = pending {
            let _ = fetch.await;
            pending = self.in_flight(key);
        }
        self.cache.snapshot(key)
    }

    /// Warm `key` without a waiting consumer. Returns whether a fetch was started;
    /// fresh and already-loading entries are left alone.
    pub fn prefetch(&self, key: &QueryKey, fetch: FetchFn, options: &QueryOptions) -> bool {
        match self.ensure(key, fetch, options) {
            Ensured::Started(_) => true,
            Ensured::Fresh | Ensured::Held | Ensured::Joined(_) => {
                debug!("Prefetch of '{}' skipped", key);
                false
            }
        }
    }

    /// Start a new fetch even when the entry is fresh, superseding any running one.
    /// While the key is held the entry is only marked stale.
    pub fn refetch(&self, key: &QueryKey, fetch: FetchFn, options: &QueryOptions) {
        let mut registry = self.registry.lock();
        let state = registry.entry(*key).or_default();
        if state.writers > 0 {
            debug!("Refetch of '{}' deferred, {} write(s) pending", key, state.writers);
            self.cache.invalidate(key);
            return;
        }
        if let Some(ref running) = state.in_flight {
            debug!(
                "Superseding fetch for '{}' (generation {})",
                key, running.generation
            );
        }
        self.begin(key, state, fetch, options);
    }

    /// Mark `key` stale and refetch it straight away if it holds data.
    pub fn invalidate(&self, key: &QueryKey, fetch: FetchFn, options: &QueryOptions) {
        self.cache.invalidate(key);
        let observed = self.cache.get(key).is_some_and(|entry| entry.data.is_some());
        if observed {
            self.refetch(key, fetch, options);
        }
    }

    /// Logically cancel the running fetch for `key`; its result is ignored when it
    /// arrives. Returns false when nothing was running.
    pub fn cancel(&self, key: &QueryKey) -> bool {
        let mut registry = self.registry.lock();
        let Some(state) = registry.get_mut(key) else {
            return false;
        };
        let Some(running) = state.in_flight.take() else {
            return false;
        };
        state.latest += 1;
        debug!(
            "Cancelled fetch for '{}' (generation {})",
            key, running.generation
        );

        let entry = self.cache.snapshot(key);
        if entry.is_loading() {
            let status = if entry.error.is_some() {
                QueryStatus::Error
            } else if entry.data.is_some() {
                QueryStatus::Success
            } else {
                QueryStatus::Idle
            };
            self.cache.set_status(key, status, entry.error);
        }
        true
    }

    /// Store authoritative data for `key` received outside a fetch, discarding any
    /// running fetch.
    pub fn accept(&self, key: &QueryKey, data: CachedValue) {
        let mut registry = self.registry.lock();
        let state = registry.entry(*key).or_default();
        if state.in_flight.take().is_some() {
            state.latest += 1;
        }
        self.cache.set(key, data);
    }

    /// Keep fetches for `key` from starting until the matching [`QueryCoordinator::release`].
    /// Returns the number of holders.
    pub fn hold(&self, key: &QueryKey) -> usize {
        let mut registry = self.registry.lock();
        let state = registry.entry(*key).or_default();
        state.writers += 1;
        state.writers
    }

    /// Drop one hold on `key`. Returns how many remain.
    pub fn release(&self, key: &QueryKey) -> usize {
        let mut registry = self.registry.lock();
        let state = registry.entry(*key).or_default();
        state.writers = state.writers.saturating_sub(1);
        state.writers
    }

    pub fn holders(&self, key: &QueryKey) -> usize {
        self.registry.lock().get(key).map_or(0, |state| state.writers)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.registry
            .lock()
            .get(key)
            .is_some_and(|state| state.in_flight.is_some())
    }

    fn in_flight(&self, key: &QueryKey) -> Option<SharedFetch> {
        self.registry
            .lock()
            .get(key)
            .and_then(|state| state.in_flight.as_ref().map(|running| running.fetch.clone()))
    }

    fn ensure(&self, key: &QueryKey, fetch: FetchFn, options: &QueryOptions) -> Ensured {
        let mut registry = self.registry.lock();
        let state = registry.entry(*key).or_default();

        if let Some(ref running) = state.in_flight {
            debug!(
                "Joining in-flight fetch for '{}' (generation {})",
                key, running.generation
            );
            return Ensured::Joined(running.fetch.clone());
        }

        let stale = self
            .cache
            .get(key)
            .is_none_or(|entry| entry.is_stale(options.stale_time));
        if !stale {
            debug!("Serving fresh '{}' from cache", key);
            return Ensured::Fresh;
        }
        if state.writers > 0 {
            debug!("Serving '{}' from cache, {} write(s) pending", key, state.writers);
            return Ensured::Held;
        }

        Ensured::Started(self.begin(key, state, fetch, options))
    }

    fn begin(
        &self,
        key: &QueryKey,
        state: &mut KeyState,
        fetch: FetchFn,
        options: &QueryOptions,
    ) -> SharedFetch {
        state.latest += 1;
        let generation = state.latest;

        let task = run_fetch(
            self.cache.clone(),
            self.registry.clone(),
            *key,
            generation,
            fetch,
            *options,
        )
        .boxed()
        .shared();

        state.in_flight = Some(InFlight {
            generation,
            fetch: task.clone(),
        });
        self.cache.set_status(key, QueryStatus::Loading, None);
        tokio::spawn(task.clone());

        debug!("Started fetch for '{}' (generation {})", key, generation);
        task
    }
}

impl std::fmt::Debug for QueryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCoordinator")
            .field("cache", &self.cache)
            .field("tracked_keys", &self.registry.lock().len())
            .finish()
    }
}

async fn run_fetch(
    cache: Arc<EntryCache>,
    registry: Registry,
    key: QueryKey,
    generation: u64,
    fetch: FetchFn,
    options: QueryOptions,
) -> Result<CachedValue> {
    let outcome = match fetch().await {
        Err(err) if options.retry && err.is_retryable() && is_current(&registry, &key, generation) => {
            warn!(
                "Fetch for '{}' failed ({}), retrying in {:?}",
                key, err, options.retry_delay
            );
            tokio::time::sleep(options.retry_delay).await;
            fetch().await
        }
        outcome => outcome,
    };
    settle(&cache, &registry, &key, generation, &outcome);
    outcome
}

fn is_current(registry: &Registry, key: &QueryKey, generation: u64) -> bool {
    registry
        .lock()
        .get(key)
        .is_some_and(|state| state.latest == generation)
}

fn settle(
    cache: &EntryCache,
    registry: &Registry,
    key: &QueryKey,
    generation: u64,
    outcome: &Result<CachedValue>,
) {
    let mut registry = registry.lock();
    let state = registry.entry(*key).or_default();

    if state.latest != generation {
        debug!(
            "Discarding stale response for '{}' (generation {}, latest {})",
            key, generation, state.latest
        );
        cache.publish(CacheEvent::stale_discarded(*key, generation));
        return;
    }

    state.in_flight = None;
    match outcome {
        Ok(data) => {
            info!("Fetched '{}'", key);
            cache.set(key, data.clone());
        }
        Err(err) => {
            warn!("Fetch for '{}' failed: {}", key, err);
            cache.set_status(key, QueryStatus::Error, Some(err.clone()));
        }
    }
}
