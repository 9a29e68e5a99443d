// Test doubles shared by the coordinator and storefront tests

use crate::cache::CachedValue;
use crate::domain::{CartLine, CartSnapshot, Category, CategoryId, LineId, Product, ProductId};
use crate::planes::query::FetchFn;
use crate::ports::CatalogClient;
use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use shared::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::oneshot;

pub fn product(id: u64, price: f64, stock: u32) -> Product {
    Product {
        id: ProductId(id),
        name: Some(format!("Juego {}", id)),
        price: Some(price),
        image_url: Some(format!("https://img/{}.png", id)),
        stock: Some(stock),
        description: None,
    }
}

/// Let every runnable spawned task make progress on the current-thread runtime.
pub async fn drain_tasks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

enum Step {
    Ready(Result<CachedValue>),
    Held(oneshot::Receiver<Result<CachedValue>>),
}

/// Fetch function whose responses are queued by the test. Each call consumes the
/// next step at call time.
pub struct ScriptedFetch {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedFetch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn push_ready(&self, result: Result<CachedValue>) {
        self.steps.lock().push_back(Step::Ready(result));
    }

    /// Queue a response that is only delivered through the returned sender
    pub fn push_held(&self) -> oneshot::Sender<Result<CachedValue>> {
        let (tx, rx) = oneshot::channel();
        self.steps.lock().push_back(Step::Held(rx));
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fetcher(self: &Arc<Self>) -> FetchFn {
        let script = self.clone();
        Arc::new(move || {
            script.calls.fetch_add(1, Ordering::SeqCst);
            let step = script.steps.lock().pop_front();
            async move {
                match step {
                    Some(Step::Ready(result)) => result,
                    Some(Step::Held(rx)) => rx
                        .await
                        .unwrap_or_else(|_| Err(Error::Internal("response dropped".into()))),
                    None => Err(Error::Internal("no scripted response".into())),
                }
            }
            .boxed()
        })
    }
}

pub const GET_CART: &str = "get_cart";
pub const ADD_TO_CART: &str = "add_to_cart";
pub const UPDATE_CART_LINE: &str = "update_cart_line";
pub const REMOVE_CART_LINE: &str = "remove_cart_line";

struct ServerState {
    products: Vec<Product>,
    categories: Vec<Category>,
    category_products: HashMap<CategoryId, Vec<ProductId>>,
    cart: Vec<CartLine>,
    next_line: u64,
}

/// In-memory catalog service. Cart writes change server state like the real backend;
/// individual calls can be made to fail or to wait for the test's go-ahead.
pub struct FakeCatalog {
    state: Mutex<ServerState>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, VecDeque<Error>>>,
    gates: Mutex<HashMap<&'static str, VecDeque<oneshot::Receiver<()>>>>,
    return_cart: bool,
}

impl FakeCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            state: Mutex::new(ServerState {
                products,
                categories: Vec::new(),
                category_products: HashMap::new(),
                cart: Vec::new(),
                next_line: 100,
            }),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            return_cart: true,
        }
    }

    /// Cart writes answer without a cart body, as some backends do
    pub fn without_cart_responses(mut self) -> Self {
        self.return_cart = false;
        self
    }

    pub fn with_category(self, category: Category, products: Vec<ProductId>) -> Self {
        {
            let mut state = self.state.lock();
            state.category_products.insert(category.id, products);
            state.categories.push(category);
        }
        self
    }

    /// Put a line straight into the server's cart
    pub fn seed_cart_line(&self, product_id: ProductId, quantity: u32) -> LineId {
        let mut state = self.state.lock();
        let line = Self::line_for(&mut state, product_id, quantity);
        let id = line.id;
        state.cart.push(line);
        id
    }

    pub fn server_cart(&self) -> CartSnapshot {
        CartSnapshot::new(self.state.lock().cart.clone())
    }

    pub fn fail_next(&self, op: &'static str, error: Error) {
        self.failures.lock().entry(op).or_default().push_back(error);
    }

    /// The next call to `op` waits until the returned sender fires (or is dropped)
    pub fn hold_next(&self, op: &'static str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().entry(op).or_default().push_back(rx);
        tx
    }

    pub fn calls(&self, op: &'static str) -> usize {
        self.calls.lock().get(op).copied().unwrap_or(0)
    }

    async fn enter(&self, op: &'static str) -> Result<()> {
        *self.calls.lock().entry(op).or_default() += 1;
        let gate = self.gates.lock().get_mut(op).and_then(|q| q.pop_front());
        let failure = self.failures.lock().get_mut(op).and_then(|q| q.pop_front());
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn line_for(state: &mut ServerState, product_id: ProductId, quantity: u32) -> CartLine {
        let product = state.products.iter().find(|p| p.id == product_id).cloned();
        state.next_line += 1;
        CartLine {
            id: LineId::Server(state.next_line),
            product_id,
            quantity,
            unit_price: product.as_ref().and_then(|p| p.price),
            product_name: product.as_ref().and_then(|p| p.name.clone()),
            product_image: product.and_then(|p| p.image_url),
        }
    }

    fn cart_reply(&self) -> Option<CartSnapshot> {
        self.return_cart.then(|| self.server_cart())
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_products(&self) -> Result<Vec<Product>> {
        self.enter("list_products").await?;
        Ok(self.state.lock().products.clone())
    }

    async fn get_product(&self, id: ProductId) -> Result<Product> {
        self.enter("get_product").await?;
        self.state
            .lock()
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(Error::NotFound)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        self.enter("list_categories").await?;
        Ok(self.state.lock().categories.clone())
    }

    async fn get_category_products(&self, id: CategoryId) -> Result<Vec<Product>> {
        self.enter("get_category_products").await?;
        let state = self.state.lock();
        let ids = state.category_products.get(&id).ok_or(Error::NotFound)?;
        Ok(state
            .products
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn get_cart(&self) -> Result<CartSnapshot> {
        self.enter(GET_CART).await?;
        Ok(self.server_cart())
    }

    async fn add_to_cart(&self, product_id: ProductId, quantity: u32) -> Result<Option<CartSnapshot>> {
        self.enter(ADD_TO_CART).await?;
        {
            let mut state = self.state.lock();
            match state.cart.iter_mut().find(|l| l.product_id == product_id) {
                Some(line) => line.quantity += quantity,
                None => {
                    let line = Self::line_for(&mut state, product_id, quantity);
                    state.cart.push(line);
                }
            }
        }
        Ok(self.cart_reply())
    }

    async fn update_cart_line(&self, line_id: u64, quantity: u32) -> Result<Option<CartSnapshot>> {
        self.enter(UPDATE_CART_LINE).await?;
        {
            let mut state = self.state.lock();
            let line = state
                .cart
                .iter_mut()
                .find(|l| l.id == LineId::Server(line_id))
                .ok_or(Error::NotFound)?;
            line.quantity = quantity;
        }
        Ok(self.cart_reply())
    }

    async fn remove_cart_line(&self, line_id: u64) -> Result<()> {
        self.enter(REMOVE_CART_LINE).await?;
        self.state
            .lock()
            .cart
            .retain(|l| l.id != LineId::Server(line_id));
        Ok(())
    }
}
