//! # Seed Ledger Generator
//!
//! Populates a database with a demo Kardex for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./kardex_dev.db with 200 orders (default)
//! cargo run -p kardex-db --bin seed
//!
//! # Custom amount
//! cargo run -p kardex-db --bin seed -- --orders 1000
//!
//! # Specify database path
//! cargo run -p kardex-db --bin seed -- --db ./data/kardex.db
//!
//! # Watch every append
//! RUST_LOG=info,kardex=debug cargo run -p kardex-db --bin seed
//! ```
//!
//! ## Generated Movements
//! - One purchase order per product into the kitchen (warehouse 4)
//! - A transfer of drinks from the kitchen to the bar (warehouse 5)
//! - `--orders` sales spread over both warehouses; lines that would oversell
//!   are rejected by the engine and counted
//! - One waste adjustment

use std::env;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kardex_core::{
    Adjustment, Direction, Money, ProductId, PurchaseLine, Quantity, SaleLine, TransferLine, WarehouseId,
};
use kardex_db::{Database, DbConfig, EngineConfig, InventoryError};

const KITCHEN: WarehouseId = WarehouseId::new(4);
const BAR: WarehouseId = WarehouseId::new(5);

/// (product id, name, units purchased, unit cost in cents, served at the bar)
const PRODUCTS: &[(i64, &str, i64, i64, bool)] = &[
    (10, "Rice (kg)", 50, 200, false),
    (11, "Chicken breast (kg)", 30, 950, false),
    (12, "Potatoes (kg)", 80, 120, false),
    (13, "Red onion (kg)", 25, 180, false),
    (14, "Lime (unit)", 200, 15, true),
    (15, "Pisco (bottle)", 24, 2_450, true),
    (16, "Chicha morada (l)", 40, 310, true),
    (17, "Beer (bottle)", 120, 180, true),
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kardex=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut orders: i64 = 200;
    let mut config = DbConfig::from_env()?;
    if env::var("KARDEX_DB_PATH").is_err() {
        config.database_path = "./kardex_dev.db".into();
    }

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    orders = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kardex Seed Ledger Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>   Number of sale orders to post (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./kardex_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let db = Database::new(config).await?;
    let engine = db.inventory(EngineConfig::from_env()?);

    let existing = db.movements().count().await?;
    if existing > 0 {
        warn!(existing, "Ledger already has movements, skipping seed (delete the file to regenerate)");
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Purchases into the kitchen
    for (po, &(product, _, units, cents, _)) in PRODUCTS.iter().enumerate() {
        let line = PurchaseLine::new(ProductId::new(product), Quantity::from_units(units), Money::from_cents(cents));
        engine.register_purchase(po as i64 + 1, &[line], KITCHEN).await?;
    }

    // Stock the bar with half of each drink
    let bar_lines: Vec<TransferLine> = PRODUCTS
        .iter()
        .filter(|p| p.4)
        .map(|&(product, _, units, _, _)| TransferLine::new(ProductId::new(product), Quantity::from_units(units / 2)))
        .collect();
    let transfer = engine.register_transfer(1, KITCHEN, BAR, &bar_lines).await?;
    info!(batch_id = %transfer.batch_id, movements = transfer.len(), "Bar stocked");

    // Sales
    let mut posted = 0;
    let mut rejected = 0;
    for order_id in 1..=orders {
        let (product, _, _, _, at_bar) = PRODUCTS[(order_id as usize * 7) % PRODUCTS.len()];
        let warehouse = if at_bar { BAR } else { KITCHEN };
        // 0.25 .. 2.0 units
        let quantity = Quantity::from_scaled(2_500 * (1 + order_id % 8));

        match engine
            .register_sale(order_id, &[SaleLine::new(ProductId::new(product), quantity)], warehouse)
            .await
        {
            Ok(_) => posted += 1,
            Err(InventoryError::InsufficientStock { .. }) => rejected += 1,
            Err(err) => return Err(err.into()),
        }
    }
    info!(posted, rejected, "Sales posted");

    // Waste
    engine
        .register_adjustment(&Adjustment {
            product_id: ProductId::new(13),
            warehouse_id: KITCHEN,
            direction: Direction::Out,
            quantity: Quantity::from_units(2),
            unit_cost: None,
            reason: "Spoiled onions discarded at close".to_string(),
        })
        .await?;

    info!(elapsed = ?start.elapsed(), movements = db.movements().count().await?, "Seed complete");

    // Summary
    println!();
    println!("{:<24} {:>9} {:>10} {:>12}", "Product", "Warehouse", "Stock", "Value");
    for level in engine.stock_levels(None).await? {
        let name = PRODUCTS
            .iter()
            .find(|p| p.0 == level.product_id.get())
            .map_or("?", |p| p.1);
        println!(
            "{:<24} {:>9} {:>10} {:>12}",
            name,
            level.warehouse_id,
            level.quantity.to_string(),
            level.total_value.to_string()
        );
    }

    let low = engine.low_stock(None, None).await?;
    println!();
    println!("Low stock: {}", serde_json::to_string_pretty(&low)?);

    Ok(())
}
