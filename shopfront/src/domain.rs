use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub const PLACEHOLDER_NAME: &str = "Sin nombre";
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x200";
pub const PLACEHOLDER_DESCRIPTION: &str = "No hay descripción disponible para este producto.";
pub const PLACEHOLDER_CATEGORY_DESCRIPTION: &str = "Descubre los mejores juegos de esta categoría";

/// Stock at or below this count is shown as running low
pub const LOW_STOCK_THRESHOLD: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a cart line.
///
/// Lines created optimistically carry a `Temporary` id until the server's copy of the
/// cart replaces them, so they can never collide with a numeric id issued by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineId {
    Server(u64),
    Temporary(Uuid),
}

impl LineId {
    pub fn temporary() -> Self {
        LineId::Temporary(Uuid::new_v4())
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, LineId::Temporary(_))
    }

    pub fn server_id(&self) -> Option<u64> {
        match self {
            LineId::Server(id) => Some(*id),
            LineId::Temporary(_) => None,
        }
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineId::Server(id) => write!(f, "{}", id),
            LineId::Temporary(id) => write!(f, "tmp-{}", id),
        }
    }
}

impl FromStr for LineId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(raw) = s.strip_prefix("tmp-") {
            return Uuid::parse_str(raw)
                .map(LineId::Temporary)
                .map_err(|e| format!("invalid temporary line id '{}': {}", s, e));
        }
        s.parse::<u64>()
            .map(LineId::Server)
            .map_err(|_| format!("invalid line id '{}'", s))
    }
}

/// Catalog product as returned by the remote API. Every descriptive field is optional;
/// the accessor methods supply the storefront's fallbacks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(alias = "pk")]
    pub id: ProductId,
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,
    #[serde(default, alias = "precio", deserialize_with = "price::deserialize")]
    pub price: Option<f64>,
    #[serde(default, alias = "imagen_url", alias = "image")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: Option<u32>,
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockLevel {
    OutOfStock,
    Low(u32),
    Available(u32),
}

impl Product {
    pub fn display_name(&self) -> &str {
        non_blank(self.name.as_deref()).unwrap_or(PLACEHOLDER_NAME)
    }

    pub fn display_price(&self) -> f64 {
        self.price.filter(|p| p.is_finite()).unwrap_or(0.0)
    }

    pub fn image_or_placeholder(&self) -> &str {
        non_blank(self.image_url.as_deref()).unwrap_or(PLACEHOLDER_IMAGE)
    }

    pub fn description_or_placeholder(&self) -> &str {
        non_blank(self.description.as_deref()).unwrap_or(PLACEHOLDER_DESCRIPTION)
    }

    /// Missing stock is treated as none available
    pub fn stock_level(&self) -> StockLevel {
        match self.stock.unwrap_or(0) {
            0 => StockLevel::OutOfStock,
            n if n <= LOW_STOCK_THRESHOLD => StockLevel::Low(n),
            n => StockLevel::Available(n),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,
    #[serde(default, alias = "descripcion")]
    pub description: Option<String>,
}

impl Category {
    pub fn display_name(&self) -> &str {
        non_blank(self.name.as_deref()).unwrap_or("Productos")
    }

    pub fn description_or_placeholder(&self) -> &str {
        non_blank(self.description.as_deref()).unwrap_or(PLACEHOLDER_CATEGORY_DESCRIPTION)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(alias = "line_id")]
    pub id: LineId,
    #[serde(alias = "producto_id")]
    pub product_id: ProductId,
    #[serde(alias = "cantidad")]
    pub quantity: u32,
    #[serde(
        default,
        alias = "precio",
        alias = "precio_unitario",
        deserialize_with = "price::deserialize"
    )]
    pub unit_price: Option<f64>,
    #[serde(default, alias = "nombre", alias = "producto_nombre")]
    pub product_name: Option<String>,
    #[serde(default, alias = "imagen_url", alias = "image_url")]
    pub product_image: Option<String>,
}

impl CartLine {
    /// Build the optimistic line for a product that is not yet in the cart. Name, price
    /// and image are copied from the catalog record when one is cached.
    pub fn pending(product_id: ProductId, quantity: u32, product: Option<&Product>) -> Self {
        Self {
            id: LineId::temporary(),
            product_id,
            quantity,
            unit_price: product.and_then(|p| p.price),
            product_name: product.and_then(|p| p.name.clone()),
            product_image: product.and_then(|p| p.image_url.clone()),
        }
    }

    pub fn display_name(&self) -> &str {
        non_blank(self.product_name.as_deref()).unwrap_or(PLACEHOLDER_NAME)
    }

    pub fn image_or_placeholder(&self) -> &str {
        non_blank(self.product_image.as_deref()).unwrap_or("https://via.placeholder.com/100")
    }
}

/// Contents of the cart. Holds at most one line per product and never a line at
/// quantity zero; the transformations below preserve both.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    #[serde(default, alias = "items")]
    pub lines: Vec<CartLine>,
}

impl CartSnapshot {
    pub fn new(lines: Vec<CartLine>) -> Self {
        Self { lines }.normalized()
    }

    /// Drop zero-quantity lines and fold duplicate products into the first line seen.
    pub fn normalized(self) -> Self {
        let mut lines: Vec<CartLine> = Vec::with_capacity(self.lines.len());
        for line in self.lines.into_iter().filter(|l| l.quantity > 0) {
            match lines.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity)
                }
                None => lines.push(line),
            }
        }
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, id: &LineId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.id == id)
    }

    pub fn line_for_product(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Increment the product's line, or append `new_line()` when it has none.
    pub fn with_added(
        mut self,
        product_id: ProductId,
        quantity: u32,
        new_line: impl FnOnce() -> CartLine,
    ) -> Self {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(new_line()),
        }
        self
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn with_quantity(mut self, line_id: &LineId, quantity: u32) -> Self {
        if quantity == 0 {
            return self.without_line(line_id);
        }
        if let Some(line) = self.lines.iter_mut().find(|l| &l.id == line_id) {
            line.quantity = quantity;
        }
        self
    }

    pub fn without_line(mut self, line_id: &LineId) -> Self {
        self.lines.retain(|l| &l.id != line_id);
        self
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Prices arrive either as JSON numbers or as decimal strings ("89.99").
mod price {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = Option::<Repr>::deserialize(deserializer)?;
        Ok(match repr {
            Some(Repr::Number(value)) => Some(value),
            Some(Repr::Text(raw)) => raw.trim().parse::<f64>().ok(),
            None => None,
        })
    }
}
