//! # Seed Data Generator
//!
//! Populates a database with a small catalog and opening stock for
//! development.
//!
//! ## Usage
//! ```bash
//! # 3 warehouses, 60 products (default)
//! cargo run -p stockflow-engine --bin stockflow-seed
//!
//! # Custom amount
//! cargo run -p stockflow-engine --bin stockflow-seed -- --count 200
//!
//! # Specify database path
//! cargo run -p stockflow-engine --bin stockflow-seed -- --db ./data/stockflow.db
//! ```
//!
//! Every product receives one incoming shipment into the first warehouse,
//! and every fifth product is partly transferred to the next warehouse, so
//! the resulting journal exercises all movement kinds. The run ends with a
//! ledger audit.

use std::env;

use stockflow_core::{ItemRequest, NewProduct, NewWarehouse, PageRequest};
use stockflow_engine::{init_tracing, Inventory, StockflowConfig};

/// Product families for realistic test data
const FAMILIES: &[(&str, &str, &[&str])] = &[
    (
        "Fasteners",
        "box",
        &[
            "Wood screw 4x40",
            "Wood screw 5x60",
            "Machine bolt M8",
            "Machine bolt M10",
            "Hex nut M8",
            "Hex nut M10",
            "Washer 8mm",
            "Wall plug 6mm",
            "Rivet 4mm",
            "Anchor bolt M12",
        ],
    ),
    (
        "Cables",
        "m",
        &[
            "Copper wire 1.5mm",
            "Copper wire 2.5mm",
            "Coaxial cable",
            "Ethernet Cat6",
            "Speaker cable",
            "Armoured cable",
        ],
    ),
    (
        "Paint",
        "l",
        &[
            "Primer white",
            "Enamel black",
            "Wall paint matte",
            "Varnish clear",
            "Floor paint grey",
        ],
    ),
];

const WAREHOUSES: &[(&str, &str)] = &[
    ("Central", "Dock 1"),
    ("North", "Industrial park, bay 4"),
    ("Outlet", "Retail backroom"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 60;
    let mut db_path = String::from("./stockflow_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(60);
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
                println!("Stockflow Seed Data Generator");
                println!();
                println!("Usage: stockflow-seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 60)");
                println!("  -d, --db <PATH>    Database file path (default: ./stockflow_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Stockflow Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!("Products: {}", count);
    println!();

    let inventory = Inventory::open(StockflowConfig::with_database(&db_path)).await?;
    let catalog = inventory.catalog();

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = catalog.count_products().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let user = catalog.create_user("seed", None).await?;

    let mut warehouses = Vec::with_capacity(WAREHOUSES.len());
    for (name, location) in WAREHOUSES {
        let warehouse = catalog
            .create_warehouse(NewWarehouse {
                name: name.to_string(),
                location: location.to_string(),
            })
            .await?;
        warehouses.push(warehouse.id);
    }
    println!("✓ Created {} warehouses", warehouses.len());

    println!();
    println!("Generating products...");

    let start = std::time::Instant::now();
    let mut generated = 0;
    let mut transfers = 0;

    'outer: for batch in 0.. {
        for (family, unit, names) in FAMILIES {
            for name in names.iter() {
                if generated >= count {
                    break 'outer;
                }

                let product = catalog
                    .create_product(NewProduct {
                        name: if batch == 0 {
                            name.to_string()
                        } else {
                            format!("{} #{}", name, batch + 1)
                        },
                        unit: unit.to_string(),
                        description: Some(family.to_string()),
                    })
                    .await?;

                let opening = 10 + ((generated * 37) % 190) as i64;
                inventory
                    .transactions()
                    .create_incoming(
                        warehouses[0],
                        &[ItemRequest::new(product.id, opening)],
                        user.id,
                    )
                    .await?;

                if generated % 5 == 0 {
                    inventory
                        .transactions()
                        .create_transfer(
                            warehouses[0],
                            warehouses[1 + generated % (warehouses.len() - 1)],
                            &[ItemRequest::new(product.id, opening / 2)],
                        )
                        .await?;
                    transfers += 1;
                }

                generated += 1;
                if generated % 50 == 0 {
                    println!("  Generated {} products...", generated);
                }
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} products and {} transfers in {:?}",
        generated, transfers, elapsed
    );

    println!();
    println!("Verifying ledger...");
    let stock = inventory
        .stock()
        .list(&Default::default(), PageRequest::first())
        .await?;
    println!("  Balance rows: {}", stock.total_items);

    let mismatches = inventory.stock().audit().await?;
    if mismatches.is_empty() {
        println!("✓ All balances match the shipment journal");
    } else {
        println!("⚠ {} balances disagree with the journal", mismatches.len());
    }

    inventory.close().await;

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
