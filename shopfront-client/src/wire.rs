// Request bodies and tolerant response decoding for the catalog backend

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{Error, Result};
use shopfront::domain::{CartSnapshot, Product};

#[derive(Debug, Serialize)]
pub struct AddToCartRequest {
    pub producto_id: u64,
    pub cantidad: u32,
}

#[derive(Debug, Serialize)]
pub struct UpdateCartLineRequest {
    pub cantidad: u32,
}

pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| Error::Decode(e.to_string()))
}

/// Category detail may be a bare product list or wrap it under `productos` or
/// `products`. Any other shape is an empty list.
pub fn category_products(body: &[u8]) -> Result<Vec<Product>> {
    let value: Value = decode(body)?;
    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut fields) => match fields.remove("productos") {
            Some(list @ Value::Array(_)) => list,
            _ => fields.remove("products").unwrap_or(Value::Null),
        },
        _ => Value::Null,
    };
    match list {
        Value::Array(_) => serde_json::from_value(list).map_err(|e| Error::Decode(e.to_string())),
        _ => Ok(Vec::new()),
    }
}

/// Cart returned by a write, when the body actually is one. Backends differ: some echo
/// the cart, some the touched line, some nothing at all.
pub fn cart_reply(body: &[u8]) -> Option<CartSnapshot> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let value: Value = serde_json::from_slice(body).ok()?;
    let holds_lines = ["items", "lines"]
        .iter()
        .any(|field| value.get(field).is_some_and(Value::is_array));
    if !holds_lines {
        return None;
    }
    serde_json::from_value::<CartSnapshot>(value)
        .ok()
        .map(CartSnapshot::normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront::domain::{LineId, ProductId};

    #[test]
    fn test_request_bodies_use_backend_field_names() {
        let add = serde_json::to_value(AddToCartRequest {
            producto_id: 7,
            cantidad: 2,
        })
        .unwrap();
        assert_eq!(add, serde_json::json!({"producto_id": 7, "cantidad": 2}));

        let update = serde_json::to_value(UpdateCartLineRequest { cantidad: 4 }).unwrap();
        assert_eq!(update, serde_json::json!({"cantidad": 4}));
    }

    #[test]
    fn test_products_decode_spanish_fields_and_string_prices() {
        let body = br#"[
            {"id": 1, "nombre": "Catan", "precio": "89.99", "stock": 15,
             "imagen_url": "https://img/catan.png", "descripcion": "Clasico"},
            {"id": 2}
        ]"#;

        let products: Vec<Product> = decode(body).unwrap();

        assert_eq!(products[0].display_name(), "Catan");
        assert_eq!(products[0].price, Some(89.99));
        assert_eq!(products[0].stock, Some(15));
        assert_eq!(products[1].display_name(), "Sin nombre");
        assert_eq!(products[1].display_price(), 0.0);
    }

    #[test]
    fn test_category_products_unwraps_known_shapes() {
        let bare = br#"[{"id": 1}]"#;
        let spanish = br#"{"id": 3, "nombre": "Rol", "productos": [{"id": 1}, {"id": 2}]}"#;
        let english = br#"{"products": [{"id": 5}]}"#;
        let other = br#"{"id": 3, "nombre": "Rol"}"#;

        assert_eq!(category_products(bare).unwrap().len(), 1);
        assert_eq!(category_products(spanish).unwrap().len(), 2);
        assert_eq!(category_products(english).unwrap()[0].id, ProductId(5));
        assert!(category_products(other).unwrap().is_empty());
        assert!(category_products(b"42").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json_is_a_decode_error() {
        assert!(matches!(category_products(b"{not json"), Err(Error::Decode(_))));
        assert!(matches!(decode::<Vec<Product>>(b"[{}]"), Err(Error::Decode(_))));
    }

    #[test]
    fn test_cart_reply_only_accepts_carts() {
        let cart = br#"{"items": [
            {"id": 11, "producto_id": 7, "cantidad": 2, "precio": "5.50", "nombre": "Go"},
            {"id": 12, "producto_id": 7, "cantidad": 1}
        ]}"#;

        let snapshot = cart_reply(cart).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.lines[0].id, LineId::Server(11));
        assert_eq!(snapshot.lines[0].quantity, 3);
        assert_eq!(snapshot.lines[0].unit_price, Some(5.5));

        assert!(cart_reply(b"").is_none());
        assert!(cart_reply(br#"{"id": 11, "producto_id": 7, "cantidad": 2}"#).is_none());
        assert!(cart_reply(br#"{"mensaje": "ok"}"#).is_none());
    }
}
