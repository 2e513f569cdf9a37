//! # Seed Data Generator
//!
//! Populates a development database with a jewelry catalog, distributors,
//! opening stock and a few showcases in different states.
//!
//! ## Usage
//! ```bash
//! # Default config file and database path
//! cargo run -p mostruario-db --bin seed
//!
//! # Specific database file
//! cargo run -p mostruario-db --bin seed -- --db ./data/mostruario.db
//!
//! # Specific config file
//! cargo run -p mostruario-db --bin seed -- --config ./mostruario.toml
//! ```
//!
//! Logging follows `RUST_LOG` (default `info,mostruario=debug,sqlx=warn`).

use std::env;
use std::path::PathBuf;

use mostruario_core::settlement::{CommissionMode, RegisterSaleRequest, SaleLineInput};
use mostruario_core::showcase::{CreateShowcaseRequest, ReturnLineInput, ShowcaseLineInput};
use mostruario_core::Product;
use mostruario_db::{Database, DbConfig, LedgerConfig, NewDistributor, NewProduct};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (category, [(code, name, cost, selling)])
const CATALOG: &[(&str, &[(&str, &str, i64, Option<i64>)])] = &[
    (
        "Anéis",
        &[
            ("AN-0001", "Anel solitário prata", 4500, Some(12900)),
            ("AN-0002", "Anel aparador", 2800, Some(7900)),
            ("AN-0003", "Anel falange", 1500, None),
        ],
    ),
    (
        "Brincos",
        &[
            ("BR-0001", "Brinco argola média", 2200, Some(5900)),
            ("BR-0002", "Brinco ponto de luz", 1800, Some(4900)),
            ("BR-0003", "Ear cuff", 2600, None),
        ],
    ),
    (
        "Colares",
        &[
            ("CO-0001", "Colar riviera", 9500, Some(24900)),
            ("CO-0002", "Choker veneziana", 3800, Some(9900)),
        ],
    ),
    (
        "Pulseiras",
        &[
            ("PU-0001", "Pulseira elo português", 5200, Some(13900)),
            ("PU-0002", "Tornozeleira bolinhas", 2100, None),
        ],
    ),
];

const DISTRIBUTORS: &[(&str, &str)] = &[
    ("Ana Souza", "Limeira"),
    ("Beatriz Lima", "Piracicaba"),
    ("Carla Mendes", "Campinas"),
];

const OPENING_STOCK: i64 = 30;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mostruario Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (overrides config)");
                println!("  -c, --config <PATH>   Config file (default: platform config dir)");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = LedgerConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    info!(path = %config.database.path.display(), "Opening database");
    let db = Database::new(DbConfig::from_ledger_config(&config)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        println!("Database already has {} products. Delete the file to regenerate.", existing);
        return Ok(());
    }

    let start = std::time::Instant::now();

    // Catalog and opening stock
    let mut products: Vec<Product> = Vec::new();
    for (category_name, items) in CATALOG {
        let category = db.products().insert_category(category_name).await?;
        for (code, name, cost, selling) in *items {
            let product = db
                .products()
                .insert(&NewProduct {
                    code: code.to_string(),
                    name: name.to_string(),
                    category_id: Some(category.id.clone()),
                    cost_price_cents: *cost,
                    selling_price_cents: *selling,
                    ..Default::default()
                })
                .await?;
            db.ledger()
                .record_movement(&product.id, OPENING_STOCK, "Estoque inicial")
                .await?;
            products.push(product);
        }
    }
    info!(count = products.len(), "Catalog seeded");

    // Distributors
    let mut distributor_ids = Vec::new();
    for (name, city) in DISTRIBUTORS {
        let distributor = db
            .distributors()
            .insert(&NewDistributor {
                name: name.to_string(),
                city: Some(city.to_string()),
                ..Default::default()
            })
            .await?;
        distributor_ids.push(distributor.id);
    }
    info!(count = distributor_ids.len(), "Distributors seeded");

    // A distributor-specific price on the first product
    db.distributors()
        .set_resale_price(&distributor_ids[0], &products[0].id, 11900)
        .await?;

    // Showcase 1: shipped, partly returned, settled at 10%
    let settled = ship(&db, &distributor_ids[0], &products[0..3], 4).await?;
    db.showcases()
        .finish(&settled.id, &returns(&products[0..3], 1))
        .await?;
    let summary = db
        .sales()
        .register_sale(&RegisterSaleRequest {
            showcase_id: settled.id.clone(),
            lines: products[0..3]
                .iter()
                .map(|p| SaleLineInput {
                    product_id: p.id.clone(),
                    unit_price_cents: p.selling_price_cents.unwrap_or(p.cost_price_cents),
                    commission_bps: None,
                })
                .collect(),
            mode: CommissionMode::Global { commission_bps: 1000 },
            description: Some("Acerto mensal".to_string()),
        })
        .await?;
    info!(
        code = %settled.code,
        total_cents = summary.totals.total.cents(),
        commission_cents = summary.totals.commission.cents(),
        "Settled showcase seeded"
    );

    // Showcase 2: everything came back
    let returned = ship(&db, &distributor_ids[1], &products[3..5], 2).await?;
    db.showcases()
        .finish(&returned.id, &returns(&products[3..5], 2))
        .await?;

    // Showcase 3: still with the distributor
    let active = ship(&db, &distributor_ids[1], &products[5..9], 3).await?;
    info!(code = %active.code, "Active showcase seeded");

    let elapsed = start.elapsed();
    println!("Seed complete in {:?}", elapsed);
    for level in db.ledger().stock_levels().await? {
        println!("  {:<8} {:>4}", level.code, level.stock);
    }

    db.close().await;
    Ok(())
}

async fn ship(
    db: &Database,
    distributor_id: &str,
    products: &[Product],
    quantity: i64,
) -> Result<mostruario_core::Showcase, mostruario_db::DbError> {
    db.showcases()
        .create(&CreateShowcaseRequest {
            distributor_id: distributor_id.to_string(),
            lines: products
                .iter()
                .map(|p| ShowcaseLineInput {
                    product_id: p.id.clone(),
                    quantity,
                })
                .collect(),
        })
        .await
}

fn returns(products: &[Product], returned_quantity: i64) -> Vec<ReturnLineInput> {
    products
        .iter()
        .map(|p| ReturnLineInput {
            product_id: p.id.clone(),
            returned_quantity,
        })
        .collect()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mostruario=debug,sqlx=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
