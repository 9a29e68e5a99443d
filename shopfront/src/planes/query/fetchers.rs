use crate::cache::CachedValue;
use crate::keys::QueryKey;
use crate::ports::CatalogClient;
use futures::FutureExt;
use futures::future::BoxFuture;
use shared::Result;
use std::sync::Arc;

pub type FetchFuture = BoxFuture<'static, Result<CachedValue>>;

/// Produces a fresh remote read each time it is called; called twice when the first
/// attempt is retried.
pub type FetchFn = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Fetch function that reads `key` from the remote catalog.
pub fn for_key(key: QueryKey, client: Arc<dyn CatalogClient>) -> FetchFn {
    Arc::new(move || {
        let client = client.clone();
        async move {
            match key {
                QueryKey::Products => client.list_products().await.map(CachedValue::Products),
                QueryKey::ProductDetail(id) => client
                    .get_product(id)
                    .await
                    .map(|product| CachedValue::Product(Box::new(product))),
                QueryKey::Categories => client.list_categories().await.map(CachedValue::Categories),
                QueryKey::CategoryProducts(id) => client
                    .get_category_products(id)
                    .await
                    .map(CachedValue::Products),
                QueryKey::Cart => client.get_cart().await.map(CachedValue::Cart),
            }
        }
        .boxed()
    })
}
