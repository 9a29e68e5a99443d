// shopfront-client/src/lib.rs
pub mod wire;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::config::Config;
use shared::{Error, Result};
use shopfront::domain::{CartSnapshot, Category, CategoryId, Product, ProductId};
use shopfront::ports::CatalogClient;
use tracing::{debug, warn};
use wire::{AddToCartRequest, UpdateCartLineRequest};

/// [`CatalogClient`] over the storefront's REST backend.
#[derive(Clone, Debug)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!("{} {}", method, url);
        self.client.request(method, url)
    }

    /// Send and return the body of a 2xx response.
    async fn send(&self, request: RequestBuilder) -> Result<Vec<u8>> {
        let response = request.send().await.map_err(|e| {
            warn!("Request failed: {}", e);
            Error::Transport(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if status.is_success() {
            Ok(body.to_vec())
        } else {
            Err(status_error(status, &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.send(self.request(Method::GET, path)).await?;
        wire::decode(&body)
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> Error {
    if status == StatusCode::NOT_FOUND {
        return Error::NotFound;
    }
    let message = String::from_utf8_lossy(body).trim().to_string();
    warn!("Server returned {}: {}", status, message);
    Error::Status {
        code: status.as_u16(),
        message: if message.is_empty() {
            status.canonical_reason().unwrap_or("unknown").to_string()
        } else {
            message
        },
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_products(&self) -> Result<Vec<Product>> {
        self.get("productos/").await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.get(&format!("productos/{}/", id)).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.get("categorias/").await
    }

    async fn get_category_products(&self, id: CategoryId) -> Result<Vec<Product>> {
        let body = self
            .send(self.request(Method::GET, &format!("categorias/{}/", id)))
            .await?;
        wire::category_products(&body)
    }

    async fn get_cart(&self) -> Result<CartSnapshot> {
        let cart: CartSnapshot = self.get("carrito/").await?;
        Ok(cart.normalized())
    }

    async fn add_to_cart(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Option<CartSnapshot>> {
        let request = self
            .request(Method::POST, "carrito/agregar/")
            .json(&AddToCartRequest {
                producto_id: product_id.0,
                cantidad: quantity,
            });
        let body = self.send(request).await?;
        Ok(wire::cart_reply(&body))
    }

    async fn update_cart_line(&self, line_id: u64, quantity: u32) -> Result<Option<CartSnapshot>> {
        let request = self
            .request(Method::PUT, &format!("carrito/actualizar/{}/", line_id))
            .json(&UpdateCartLineRequest { cantidad: quantity });
        let body = self.send(request).await?;
        Ok(wire::cart_reply(&body))
    }

    async fn remove_cart_line(&self, line_id: u64) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("carrito/eliminar/{}/", line_id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response and hand back the request line it answered.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            // Read headers and any body so closing the socket never resets the reply
            loop {
                if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
                    let length = headers
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let text = String::from_utf8_lossy(&request).to_string();
            let _ = tx.send(text.lines().next().unwrap_or_default().to_string());
        });

        (format!("http://{}/api/", addr), rx)
    }

    fn client(api_url: String) -> HttpCatalogClient {
        HttpCatalogClient::new(&Config {
            api_url,
            request_timeout: Duration::from_secs(5),
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_base_url_is_trimmed() {
        let client = client("http://shop.test/api/".into());
        assert_eq!(client.base_url(), "http://shop.test/api");
        assert_eq!(client.url("productos/"), "http://shop.test/api/productos/");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_error(StatusCode::NOT_FOUND, b"{}"), Error::NotFound);
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, b""),
            Error::Status {
                code: 500,
                message: "Internal Server Error".into()
            }
        );
        assert_eq!(
            status_error(StatusCode::BAD_REQUEST, b"sin stock"),
            Error::Status {
                code: 400,
                message: "sin stock".into()
            }
        );
    }

    #[tokio::test]
    async fn test_get_product_over_http() {
        let (url, request_line) =
            serve_once("200 OK", r#"{"id": 4, "nombre": "Go", "precio": "24.99", "stock": 18}"#).await;

        let product = client(url).get_product(ProductId(4)).await.unwrap();

        assert_eq!(product.display_name(), "Go");
        assert_eq!(product.price, Some(24.99));
        assert_eq!(request_line.await.unwrap(), "GET /api/productos/4/ HTTP/1.1");
    }

    #[tokio::test]
    async fn test_missing_product_is_not_found() {
        let (url, _) = serve_once("404 Not Found", r#"{"detail": "No encontrado."}"#).await;

        let err = client(url).get_product(ProductId(99)).await.unwrap_err();

        assert_eq!(err, Error::NotFound);
    }

    #[tokio::test]
    async fn test_add_to_cart_posts_and_reads_cart_reply() {
        let (url, request_line) = serve_once(
            "201 Created",
            r#"{"items": [{"id": 31, "producto_id": 2, "cantidad": 1}]}"#,
        )
        .await;

        let cart = client(url).add_to_cart(ProductId(2), 1).await.unwrap().unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(request_line.await.unwrap(), "POST /api/carrito/agregar/ HTTP/1.1");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}/api", addr))
            .list_products()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert!(err.is_retryable());
    }
}
