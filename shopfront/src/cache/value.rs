use crate::domain::{CartSnapshot, Category, Product};

/// Payload stored under a query key.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Products(Vec<Product>),
    Product(Box<Product>),
    Categories(Vec<Category>),
    Cart(CartSnapshot),
}

impl CachedValue {
    pub fn as_cart(&self) -> Option<&CartSnapshot> {
        match self {
            CachedValue::Cart(cart) => Some(cart),
            _ => None,
        }
    }

    /// Look up a product record in a detail or listing payload.
    pub fn find_product(&self, id: crate::domain::ProductId) -> Option<&Product> {
        match self {
            CachedValue::Product(product) if product.id == id => Some(product),
            CachedValue::Products(products) => products.iter().find(|p| p.id == id),
            _ => None,
        }
    }
}

/// Typed view over a [`CachedValue`] variant.
pub trait CacheData: Sized + Clone + Send + 'static {
    fn from_cached(value: CachedValue) -> Option<Self>;
}

impl CacheData for Vec<Product> {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Products(products) => Some(products),
            _ => None,
        }
    }
}

impl CacheData for Product {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Product(product) => Some(*product),
            _ => None,
        }
    }
}

impl CacheData for Vec<Category> {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Categories(categories) => Some(categories),
            _ => None,
        }
    }
}

impl CacheData for CartSnapshot {
    fn from_cached(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Cart(cart) => Some(cart),
            _ => None,
        }
    }
}
