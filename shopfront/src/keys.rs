use crate::domain::{CategoryId, ProductId};
use serde::Serialize;
use std::fmt;

/// Identifies one cacheable remote read. Two keys name the same cache slot iff they
/// are equal as values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "query", content = "id", rename_all = "snake_case")]
pub enum QueryKey {
    Products,
    ProductDetail(ProductId),
    Categories,
    CategoryProducts(CategoryId),
    Cart,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::Products => write!(f, "products"),
            QueryKey::ProductDetail(id) => write!(f, "product/{}", id),
            QueryKey::Categories => write!(f, "categories"),
            QueryKey::CategoryProducts(id) => write!(f, "category-products/{}", id),
            QueryKey::Cart => write!(f, "cart"),
        }
    }
}
