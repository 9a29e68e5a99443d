mod commands;

use commands::{Command, HELP};
use shared::config::Config;
use shopfront::cache::QueryStatus;
use shopfront::domain::{CartSnapshot, Product, StockLevel};
use shopfront::projection::{format_price, line_total};
use shopfront::{QueryState, Storefront};
use shopfront_client::HttpCatalogClient;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    info!("Using catalog API at {}", config.api_url);

    let client = Arc::new(HttpCatalogClient::new(&config)?);
    let storefront = Arc::new(Storefront::new(client, &config));

    if let Some(mut events) = storefront.subscribe() {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => match serde_json::to_string(&event) {
                        Ok(json) => debug!("cache event {}", json),
                        Err(e) => warn!("Failed to encode cache event: {}", e),
                    },
                    Err(RecvError::Lagged(missed)) => warn!("Event log lagged, {} events missed", missed),
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match Command::parse(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => run(&storefront, command).await,
            Err(message) => println!("{}", message),
        }
    }

    info!("Shell closed");
    Ok(())
}

async fn run(storefront: &Storefront, command: Command) {
    match command {
        Command::Products => {
            let state = storefront.load_products().await;
            report(&state, |products| products.iter().for_each(print_product));
        }
        Command::Product(id) => {
            let state = storefront.load_product(Some(id)).await;
            report(&state, |product| {
                print_product(product);
                println!("    {}", product.description_or_placeholder());
            });
        }
        Command::Categories => {
            let state = storefront.load_categories().await;
            report(&state, |categories| {
                for category in categories {
                    println!(
                        "[{}] {} - {}",
                        category.id,
                        category.display_name(),
                        category.description_or_placeholder()
                    );
                    storefront.prefetch_category_products(category.id);
                }
            });
        }
        Command::Category(id) => {
            let state = storefront.load_category_products(Some(id)).await;
            report(&state, |products| {
                if products.is_empty() {
                    println!("no products in this category");
                }
                for product in products {
                    print_product(product);
                    storefront.prefetch_product(product.id);
                }
            });
        }
        Command::Cart => {
            let state = storefront.load_cart().await;
            report(&state, print_cart);
            let summary = storefront.cart_summary();
            println!("{} items, subtotal {}", summary.item_count, summary.formatted_subtotal());
        }
        Command::Add(id, quantity) => mutation(storefront, storefront.add_to_cart(id, quantity).await),
        Command::Set(line, quantity) => {
            mutation(storefront, storefront.update_cart_line(line, quantity).await)
        }
        Command::Increase(line) => mutation(storefront, storefront.increase_quantity(line).await),
        Command::Decrease(line) => mutation(storefront, storefront.decrease_quantity(line).await),
        Command::Remove(line) => mutation(storefront, storefront.remove_from_cart(line).await),
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn report<T>(state: &QueryState<T>, render: impl FnOnce(&T)) {
    if state.is_not_found() {
        println!("not found");
        return;
    }
    if let Some(data) = &state.data {
        render(data);
    }
    match (&state.status, &state.error) {
        (QueryStatus::Error, Some(err)) if state.data.is_some() => {
            println!("(showing cached data, refresh failed: {})", err)
        }
        (QueryStatus::Error, Some(err)) => println!("error: {}", err),
        _ => {}
    }
}

fn mutation(storefront: &Storefront, outcome: shared::Result<()>) {
    match outcome {
        Ok(()) => {
            let summary = storefront.cart_summary();
            println!("ok, cart has {} items ({})", summary.item_count, summary.formatted_subtotal());
        }
        Err(err) => println!("cart unchanged: {}", err),
    }
}

fn print_product(product: &Product) {
    let stock = match product.stock_level() {
        StockLevel::OutOfStock => "agotado".to_string(),
        StockLevel::Low(n) => format!("solo quedan {}", n),
        StockLevel::Available(n) => format!("{} en stock", n),
    };
    println!(
        "[{}] {} {} ({})",
        product.id,
        product.display_name(),
        format_price(product.display_price()),
        stock
    );
}

fn print_cart(cart: &CartSnapshot) {
    if cart.is_empty() {
        println!("Tu carrito está vacío");
        return;
    }
    for line in &cart.lines {
        println!(
            "line {}: {} x{} = {}",
            line.id,
            line.display_name(),
            line.quantity,
            format_price(line_total(line))
        );
    }
}
