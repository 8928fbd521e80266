//! # Seed Data Generator
//!
//! Populates the ledger with demo loyalty accounts for development.
//!
//! ## Usage
//! ```bash
//! # 50 demo customers (default)
//! cargo run -p souq-db --bin seed
//!
//! # Custom amount and database path
//! cargo run -p souq-db --bin seed -- --count 200 --db ./data/loyalty.db
//!
//! # Verbose engine/ledger logs
//! RUST_LOG=souq_core=debug,souq_db=debug cargo run -p souq-db --bin seed
//! ```
//!
//! Each customer gets a welcome credit and one settled order; the last
//! customer's next checkout is printed as a JSON preview.

use std::env;

use souq_core::{LoyaltyConfig, LoyaltyEngine, Money};
use souq_db::{Database, DbConfig, LoyaltyCheckout};
use tracing_subscriber::EnvFilter;

/// Welcome credits cycled across demo customers.
const WELCOME_CREDITS: &[i64] = &[200, 600, 1000, 1500, 2400, 5000];

/// Demo order subtotals in pounds.
const ORDER_SUBTOTALS: &[i64] = &[45, 120, 260, 310, 480, 1000];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let args: Vec<String> = env::args().collect();
    let mut count: usize = 50;
    let mut db_path = String::from("./souq_loyalty_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Souq Loyalty Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of demo customers (default: 50)");
                println!("  -d, --db <PATH>    Database file path (default: ./souq_loyalty_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Souq Loyalty Seed Data Generator");
    println!("================================");
    println!("Database:  {}", db_path);
    println!("Customers: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.accounts().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} loyalty accounts", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let engine = LoyaltyEngine::new(LoyaltyConfig::from_env()?)?;
    let checkout = LoyaltyCheckout::new(db.clone(), engine);

    let mut settled = 0;
    for n in 0..count {
        let user_id = demo_user_id(n);
        db.accounts()
            .credit(&user_id, WELCOME_CREDITS[n % WELCOME_CREDITS.len()])
            .await?;

        let subtotal = Money::from_pounds(ORDER_SUBTOTALS[n % ORDER_SUBTOTALS.len()]);
        let points = checkout.max_usable_points(&user_id, subtotal).await?;
        let use_shipping = n % 3 == 0;

        match checkout
            .redeem(&user_id, &format!("demo-order-{n:05}"), subtotal, points, use_shipping)
            .await
        {
            Ok(_) => settled += 1,
            // Slider maximum can overshoot the cap on small orders; fall back to earning only
            Err(e) => {
                eprintln!("  {}: {} (earning only)", user_id, e);
                checkout
                    .redeem(&user_id, &format!("demo-order-{n:05}"), subtotal, 0, false)
                    .await?;
                settled += 1;
            }
        }
    }

    println!();
    println!("✓ Seeded {} customers, {} settled orders", count, settled);

    if count > 0 {
        let user_id = demo_user_id(count - 1);
        let history = db.ledger().history(&user_id, 5).await?;
        let preview = checkout
            .preview(&user_id, Money::from_pounds(150), 0, true)
            .await?;

        println!();
        println!("Last customer: {}", user_id);
        println!("{}", serde_json::to_string_pretty(&history)?);
        println!("{}", serde_json::to_string_pretty(&preview)?);
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn demo_user_id(n: usize) -> String {
    format!("demo-customer-{n:05}")
}
