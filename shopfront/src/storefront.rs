use crate::cache::{CacheData, EntryCache};
use crate::domain::{CartSnapshot, Category, CategoryId, LineId, Product, ProductId};
use crate::events::CacheEvent;
use crate::keys::QueryKey;
use crate::planes::mutation::CartMutations;
use crate::planes::query::{FetchFn, QueryCoordinator, QueryOptions, QueryState, fetchers};
use crate::ports::CatalogClient;
use crate::projection::{self, CartSummary};
use shared::Result;
use shared::config::Config;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// The storefront's cache context: one per process, shared by `Arc` between views.
///
/// Synchronous readers (`products`, `cart`, ...) return what is cached right now and
/// start a background fetch when it is missing or stale. The `load_*` forms wait for
/// that fetch. Subscribe to [`CacheEvent`]s to learn when to read again.
pub struct Storefront {
    cache: Arc<EntryCache>,
    queries: Arc<QueryCoordinator>,
    mutations: CartMutations,
    client: Arc<dyn CatalogClient>,
    options: QueryOptions,
}

impl Storefront {
    pub fn new(client: Arc<dyn CatalogClient>, config: &Config) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let cache = Arc::new(EntryCache::with_event_broadcaster(event_tx));
        let queries = Arc::new(QueryCoordinator::new(cache.clone()));
        let options = QueryOptions::from_config(config);
        let mutations = CartMutations::new(cache.clone(), queries.clone(), client.clone(), options);

        info!(
            "Storefront cache ready (stale after {:?}, retry delay {:?})",
            options.stale_time, options.retry_delay
        );

        Self {
            cache,
            queries,
            mutations,
            client,
            options,
        }
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<CacheEvent>> {
        self.cache.subscribe()
    }

    /// Cart writes still waiting on the server
    pub fn pending_mutations(&self) -> usize {
        self.mutations.pending()
    }

    pub fn products(&self) -> QueryState<Vec<Product>> {
        self.read(QueryKey::Products)
    }

    pub async fn load_products(&self) -> QueryState<Vec<Product>> {
        self.load(QueryKey::Products).await
    }

    /// Detail for a product. Without an id the query is disabled and reports idle.
    pub fn product(&self, id: Option<ProductId>) -> QueryState<Product> {
        match id {
            Some(id) => self.read(QueryKey::ProductDetail(id)),
            None => QueryState::idle(),
        }
    }

    pub async fn load_product(&self, id: Option<ProductId>) -> QueryState<Product> {
        match id {
            Some(id) => self.load(QueryKey::ProductDetail(id)).await,
            None => QueryState::idle(),
        }
    }

    /// Warm a product's detail, e.g. on hover. Returns whether a fetch was started.
    pub fn prefetch_product(&self, id: ProductId) -> bool {
        self.prefetch(QueryKey::ProductDetail(id))
    }

    pub fn categories(&self) -> QueryState<Vec<Category>> {
        self.read(QueryKey::Categories)
    }

    pub async fn load_categories(&self) -> QueryState<Vec<Category>> {
        self.load(QueryKey::Categories).await
    }

    pub fn category_products(&self, id: Option<CategoryId>) -> QueryState<Vec<Product>> {
        match id {
            Some(id) => self.read(QueryKey::CategoryProducts(id)),
            None => QueryState::idle(),
        }
    }

    pub async fn load_category_products(&self, id: Option<CategoryId>) -> QueryState<Vec<Product>> {
        match id {
            Some(id) => self.load(QueryKey::CategoryProducts(id)).await,
            None => QueryState::idle(),
        }
    }

    pub fn prefetch_category_products(&self, id: CategoryId) -> bool {
        self.prefetch(QueryKey::CategoryProducts(id))
    }

    pub fn cart(&self) -> QueryState<CartSnapshot> {
        self.read(QueryKey::Cart)
    }

    pub async fn load_cart(&self) -> QueryState<CartSnapshot> {
        self.load(QueryKey::Cart).await
    }

    /// Item count and subtotal of the cart as currently cached. Never fetches.
    pub fn cart_summary(&self) -> CartSummary {
        let cart = self
            .cache
            .get(&QueryKey::Cart)
            .and_then(|entry| entry.data)
            .and_then(CartSnapshot::from_cached);
        projection::summarize(cart.as_ref())
    }

    pub async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        self.mutations.add(product_id, quantity).await
    }

    pub async fn update_cart_line(&self, line_id: LineId, quantity: u32) -> Result<()> {
        self.mutations.update_quantity(line_id, quantity).await
    }

    pub async fn increase_quantity(&self, line_id: LineId) -> Result<()> {
        self.mutations.increase(line_id).await
    }

    pub async fn decrease_quantity(&self, line_id: LineId) -> Result<()> {
        self.mutations.decrease(line_id).await
    }

    pub async fn remove_from_cart(&self, line_id: LineId) -> Result<()> {
        self.mutations.remove(line_id).await
    }

    /// Mark a key stale; it is refetched now if it has been loaded before.
    pub fn invalidate(&self, key: QueryKey) {
        self.queries.invalidate(&key, self.fetcher(key), &self.options);
    }

    fn fetcher(&self, key: QueryKey) -> FetchFn {
        fetchers::for_key(key, self.client.clone())
    }

    fn read<T: CacheData>(&self, key: QueryKey) -> QueryState<T> {
        let entry = self.queries.query(&key, self.fetcher(key), &self.options);
        QueryState::from_entry(entry, self.options.stale_time)
    }

    async fn load<T: CacheData>(&self, key: QueryKey) -> QueryState<T> {
        let entry = self.queries.fetch(&key, self.fetcher(key), &self.options).await;
        QueryState::from_entry(entry, self.options.stale_time)
    }

    fn prefetch(&self, key: QueryKey) -> bool {
        self.queries.prefetch(&key, self.fetcher(key), &self.options)
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("queries", &self.queries)
            .field("mutations", &self.mutations)
            .field("options", &self.options)
            .finish()
    }
}
