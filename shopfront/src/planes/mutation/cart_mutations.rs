use crate::cache::{CacheData, CachedValue, EntryCache};
use crate::domain::{CartLine, CartSnapshot, LineId, Product, ProductId};
use crate::keys::QueryKey;
use crate::planes::mutation::context::MutationContext;
use crate::planes::query::{QueryCoordinator, QueryOptions, fetchers};
use crate::ports::CatalogClient;
use shared::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Optimistic cart writes.
///
/// Each operation patches the cached cart before the remote call and keeps the
/// pre-patch value in a [`MutationContext`]. When the server accepts, the cart is either
/// replaced by the server's copy (no sibling mutation in flight) or marked stale and
/// refetched once the last sibling settles. When it refuses, the operation's own
/// snapshot is restored and the error is returned.
pub struct CartMutations {
    cache: Arc<EntryCache>,
    queries: Arc<QueryCoordinator>,
    client: Arc<dyn CatalogClient>,
    options: QueryOptions,
}

impl CartMutations {
    pub fn new(
        cache: Arc<EntryCache>,
        queries: Arc<QueryCoordinator>,
        client: Arc<dyn CatalogClient>,
        options: QueryOptions,
    ) -> Self {
        Self {
            cache,
            queries,
            client,
            options,
        }
    }

    /// Number of cart writes waiting on the server
    pub fn pending(&self) -> usize {
        self.queries.holders(&QueryKey::Cart)
    }

    /// Add `quantity` of a product, merging into its existing line if there is one.
    pub async fn add(&self, product_id: ProductId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            return Err(Error::validation("quantity must be at least 1"));
        }

        let product = self.cached_product(product_id);
        if let Some(stock) = product.as_ref().and_then(|p| p.stock) {
            let in_cart = self
                .current_cart()
                .and_then(|cart| cart.line_for_product(product_id).map(|l| l.quantity))
                .unwrap_or(0);
            if stock == 0 {
                return Err(Error::validation(format!("product {} is out of stock", product_id)));
            }
            if in_cart.saturating_add(quantity) > stock {
                return Err(Error::validation(format!(
                    "only {} of product {} available",
                    stock, product_id
                )));
            }
        }

        let client = self.client.clone();
        self.run(
            "add",
            move |cart| {
                cart.with_added(product_id, quantity, || {
                    CartLine::pending(product_id, quantity, product.as_ref())
                })
            },
            async move { client.add_to_cart(product_id, quantity).await },
        )
        .await
    }

    /// Set a line's quantity. Zero is treated as a removal.
    pub async fn update_quantity(&self, line_id: LineId, quantity: u32) -> Result<()> {
        if quantity == 0 {
            info!("Quantity 0 requested for line {}, removing it", line_id);
            return self.remove(line_id).await;
        }

        let server_id = self.confirmed_line(&line_id)?;
        let client = self.client.clone();
        self.run(
            "update",
            move |cart| cart.with_quantity(&line_id, quantity),
            async move { client.update_cart_line(server_id, quantity).await },
        )
        .await
    }

    pub async fn increase(&self, line_id: LineId) -> Result<()> {
        let current = self.line_quantity(&line_id)?;
        self.update_quantity(line_id, current.saturating_add(1)).await
    }

    /// Refused locally, without a remote call, when the line is already at 1.
    pub async fn decrease(&self, line_id: LineId) -> Result<()> {
        let current = self.line_quantity(&line_id)?;
        if current <= 1 {
            debug!("Decrease of line {} refused at quantity {}", line_id, current);
            return Err(Error::validation("quantity cannot go below 1"));
        }
        self.update_quantity(line_id, current - 1).await
    }

    pub async fn remove(&self, line_id: LineId) -> Result<()> {
        let server_id = self.confirmed_line(&line_id)?;
        let client = self.client.clone();
        self.run(
            "remove",
            move |cart| cart.without_line(&line_id),
            async move { client.remove_cart_line(server_id).await.map(|()| None) },
        )
        .await
    }

    async fn run<P, W>(&self, operation: &'static str, patch: P, write: W) -> Result<()>
    where
        P: FnOnce(CartSnapshot) -> CartSnapshot,
        W: Future<Output = Result<Option<CartSnapshot>>>,
    {
        // No cart read may start until this write settles, and one already on the wire
        // predates the patch
        let guard = PendingWrite::begin(self);
        self.queries.cancel(&QueryKey::Cart);

        let context = MutationContext::apply(
            &self.cache,
            QueryKey::Cart,
            || CachedValue::Cart(CartSnapshot::default()),
            move |current| match current {
                CachedValue::Cart(cart) => CachedValue::Cart(patch(cart)),
                other => other,
            },
        );
        debug!("Applied optimistic cart {}", operation);

        let outcome = write.await;
        let remaining = guard.finish();

        match outcome {
            Ok(server_cart) => {
                drop(context);
                match server_cart {
                    Some(cart) if remaining == 0 => {
                        info!("Cart {} confirmed by server", operation);
                        self.queries
                            .accept(&QueryKey::Cart, CachedValue::Cart(cart.normalized()));
                    }
                    _ => {
                        info!("Cart {} confirmed, cart marked stale", operation);
                        self.cache.invalidate(&QueryKey::Cart);
                    }
                }
                if remaining == 0 {
                    self.reconcile();
                }
                Ok(())
            }
            Err(err) => {
                warn!("Cart {} failed ({}), rolling back", operation, err);
                context.restore(&self.cache);
                if remaining == 0 {
                    self.reconcile();
                }
                Err(err)
            }
        }
    }

    /// Refetch a stale cart once no write is outstanding.
    fn reconcile(&self) {
        let stale = self
            .cache
            .get(&QueryKey::Cart)
            .is_some_and(|entry| entry.invalidated && entry.data.is_some());
        if stale {
            debug!("Cart writes settled, refetching cart");
            self.queries.refetch(
                &QueryKey::Cart,
                fetchers::for_key(QueryKey::Cart, self.client.clone()),
                &self.options,
            );
        }
    }

    fn current_cart(&self) -> Option<CartSnapshot> {
        self.cache
            .get(&QueryKey::Cart)
            .and_then(|entry| entry.data)
            .and_then(CartSnapshot::from_cached)
    }

    fn line_quantity(&self, line_id: &LineId) -> Result<u32> {
        self.current_cart()
            .and_then(|cart| cart.line(line_id).map(|line| line.quantity))
            .ok_or(Error::NotFound)
    }

    /// Server id of a line present in the cached cart.
    fn confirmed_line(&self, line_id: &LineId) -> Result<u64> {
        let cart = self.current_cart().ok_or(Error::NotFound)?;
        if cart.line(line_id).is_none() {
            return Err(Error::NotFound);
        }
        line_id.server_id().ok_or_else(|| {
            Error::validation(format!("cart line {} is still being created", line_id))
        })
    }

    /// Catalog record for a product from whatever the cache holds, detail first.
    fn cached_product(&self, product_id: ProductId) -> Option<Product> {
        self.cache
            .get(&QueryKey::ProductDetail(product_id))
            .and_then(|entry| entry.data)
            .and_then(Product::from_cached)
            .or_else(|| {
                self.cache.find_map(|entry| {
                    entry
                        .data
                        .as_ref()
                        .and_then(|data| data.find_product(product_id))
                        .cloned()
                })
            })
    }
}

impl std::fmt::Debug for CartMutations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartMutations")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Counts a write as outstanding until it settles. A write abandoned before the server
/// answered leaves the outcome unknown, so the cart is marked stale instead.
struct PendingWrite<'a> {
    owner: &'a CartMutations,
    armed: bool,
}

impl<'a> PendingWrite<'a> {
    fn begin(owner: &'a CartMutations) -> Self {
        owner.queries.hold(&QueryKey::Cart);
        Self { owner, armed: true }
    }

    /// Returns how many writes are still outstanding
    fn finish(mut self) -> usize {
        self.armed = false;
        self.owner.queries.release(&QueryKey::Cart)
    }
}

impl Drop for PendingWrite<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let remaining = self.owner.queries.release(&QueryKey::Cart);
        warn!("Cart write abandoned before the server answered, cart marked stale");
        self.owner.cache.invalidate(&QueryKey::Cart);
        if remaining == 0 && tokio::runtime::Handle::try_current().is_ok() {
            self.owner.reconcile();
        }
    }
}
