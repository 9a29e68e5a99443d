use crate::domain::{CartLine, CartSnapshot};
use serde::Serialize;

pub const CURRENCY_SYMBOL: &str = "S/";

/// Totals derived from the cart on every read. Never stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CartSummary {
    pub item_count: u64,
    pub subtotal: f64,
}

impl CartSummary {
    pub fn from_cart(cart: &CartSnapshot) -> Self {
        cart.lines.iter().fold(Self::default(), |summary, line| Self {
            item_count: summary.item_count + u64::from(line.quantity),
            subtotal: summary.subtotal + line_total(line),
        })
    }

    pub fn formatted_subtotal(&self) -> String {
        format_price(self.subtotal)
    }
}

/// Summary of a possibly unloaded cart. An unloaded cart is empty.
pub fn summarize(cart: Option<&CartSnapshot>) -> CartSummary {
    cart.map(CartSummary::from_cart).unwrap_or_default()
}

/// Quantity times unit price; an unknown or non-finite price counts as 0
pub fn line_total(line: &CartLine) -> f64 {
    let unit_price = line.unit_price.filter(|p| p.is_finite()).unwrap_or(0.0);
    f64::from(line.quantity) * unit_price
}

pub fn format_price(amount: f64) -> String {
    format!("{} {:.2}", CURRENCY_SYMBOL, amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LineId, ProductId};

    fn line(id: u64, product: u64, quantity: u32, price: Option<f64>) -> CartLine {
        CartLine {
            id: LineId::Server(id),
            product_id: ProductId(product),
            quantity,
            unit_price: price,
            product_name: None,
            product_image: None,
        }
    }

    #[test]
    fn test_subtotal_and_item_count() {
        let cart = CartSnapshot::new(vec![
            line(1, 1, 2, Some(25.0)),
            line(2, 2, 1, Some(10.0)),
        ]);

        let summary = CartSummary::from_cart(&cart);

        assert_eq!(summary.item_count, 3);
        assert!((summary.subtotal - 60.0).abs() < 1e-9);
        assert_eq!(summary.formatted_subtotal(), "S/ 60.00");
    }

    #[test]
    fn test_missing_prices_count_as_zero() {
        let cart = CartSnapshot::new(vec![
            line(1, 1, 4, None),
            line(2, 2, 1, Some(f64::NAN)),
            line(3, 3, 2, Some(1.5)),
        ]);

        let summary = summarize(Some(&cart));

        assert_eq!(summary.item_count, 7);
        assert!((summary.subtotal - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_unloaded_cart_is_empty() {
        assert_eq!(summarize(None), CartSummary::default());
        assert_eq!(format_price(0.0), "S/ 0.00");
    }
}
