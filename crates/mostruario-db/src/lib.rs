//! # mostruario-db: Database Layer for Mostruario
//!
//! SQLite persistence for the consignment ledger, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mostruario Data Flow                             │
//! │                                                                         │
//! │  Admin UI / reports (out of tree)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   mostruario-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ LedgerRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ShowcaseRepo  │    │ 001_initial_ │  │   │
//! │  │   │ Deadlines     │    │ SaleRepo      │    │   schema.sql │  │   │
//! │  │   │ LedgerConfig  │    │ HoldingsRepo  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │                    │                               │   │
//! │  │           │                    ▼                               │   │
//! │  │           │        mostruario-core (rules, status, money)     │   │
//! │  └───────────┼─────────────────────────────────────────────────────┘   │
//! │              ▼                                                          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration (defaults, TOML file, environment)
//! - [`pool`] - Connection pool creation and operation deadlines
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mostruario_db::{Database, DbConfig, LedgerConfig};
//!
//! let config = LedgerConfig::load(None)?;
//! let db = Database::new(DbConfig::from_ledger_config(&config)).await?;
//!
//! let showcase = db.showcases().create(&request).await?;
//! let status = db.showcases().finish(&showcase.id, &returns).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{LedgerConfig, LedgerSettings};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::distributor::{DistributorRepository, NewDistributor};
pub use repository::holdings::HoldingsRepository;
pub use repository::ledger::{LedgerRepository, StockLevel};
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::sale::SaleRepository;
pub use repository::showcase::ShowcaseRepository;
