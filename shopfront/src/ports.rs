#![deny(clippy::all)]

use crate::domain::{CartSnapshot, Category, CategoryId, Product, ProductId};
use async_trait::async_trait;
use shared::Result;

// Ports are the pluggable extension points for the remote catalog service

/// Port for the remote catalog and cart API.
///
/// Implementations own transport concerns including timeouts; a timeout surfaces
/// as [`shared::Error::Transport`].
#[async_trait]
pub trait CatalogClient: Send + Sync + 'static {
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Fails with [`shared::Error::NotFound`] when the product does not exist
    async fn get_product(&self, id: ProductId) -> Result<Product>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn get_category_products(&self, id: CategoryId) -> Result<Vec<Product>>;

    async fn get_cart(&self) -> Result<CartSnapshot>;

    /// Returns the server's cart after the write when the response carries one
    async fn add_to_cart(&self, product_id: ProductId, quantity: u32)
    -> Result<Option<CartSnapshot>>;

    /// `line_id` is always a server-issued id
    async fn update_cart_line(&self, line_id: u64, quantity: u32) -> Result<Option<CartSnapshot>>;

    async fn remove_cart_line(&self, line_id: u64) -> Result<()>;
}
