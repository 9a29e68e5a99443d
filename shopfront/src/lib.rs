// shopfront/src/lib.rs
pub mod cache;
pub mod domain;
pub mod events;
pub mod keys;
pub mod planes;
pub mod ports;
pub mod projection;
pub mod storefront;

#[cfg(test)]
mod testing;

pub use cache::{CacheEntry, CachedValue, EntryCache, QueryStatus};
pub use domain::{CartLine, CartSnapshot, Category, CategoryId, LineId, Product, ProductId, StockLevel};
pub use events::CacheEvent;
pub use keys::QueryKey;
pub use planes::query::{QueryOptions, QueryState};
pub use ports::CatalogClient;
pub use projection::CartSummary;
pub use storefront::Storefront;
