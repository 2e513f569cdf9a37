//! # Repository Module
//!
//! Database repository implementations.
//!
//! ## Repository Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reference data              Write path                 Read models    │
//! │  ──────────────              ──────────                 ───────────    │
//! │  ProductRepository           LedgerRepository           Holdings-      │
//! │  DistributorRepository  ──►  ShowcaseRepository   ──►   Repository     │
//! │                              SaleRepository                            │
//! │                                                                         │
//! │  Every public method:                                                  │
//! │  • runs under the operation deadline (pool::with_deadline)             │
//! │  • validates input through mostruario-core before touching SQL         │
//! │  • runs its writes in one transaction, or in one statement             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog and stock list
//! - [`DistributorRepository`](distributor::DistributorRepository) - Distributors and price overrides
//! - [`LedgerRepository`](ledger::LedgerRepository) - Movements and stock sums
//! - [`ShowcaseRepository`](showcase::ShowcaseRepository) - Create, finish, list showcases
//! - [`SaleRepository`](sale::SaleRepository) - Settlement and commission edits
//! - [`HoldingsRepository`](holdings::HoldingsRepository) - Held stock and history

pub mod distributor;
pub mod holdings;
pub mod ledger;
pub mod product;
pub mod sale;
pub mod showcase;
