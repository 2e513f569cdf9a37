//! # mostruario-core: Consignment Ledger Logic
//!
//! Pure domain logic for jewelry consignment: the stock ledger math, the
//! showcase (mostruário) state machine, return reconciliation, commission
//! settlement and the distributor holdings read-model. Zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Admin UI / reporting (external collaborators)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 mostruario-db (repositories)                    │   │
//! │  │   ledger • showcases • sales • holdings • catalog • config      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ rows in, decisions out                 │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ mostruario-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ledger      showcase      settlement      holdings            │   │
//! │  │   Σ stock     status fn     plan + totals   held + price        │   │
//! │  │                                                                 │   │
//! │  │   types • money • validation • error                            │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Persisted records (Product, InventoryMovement, Showcase, Sale...)
//! - [`money`] - Integer-cent money and commission math
//! - [`error`] - Domain errors tagged by [`ErrorKind`]
//! - [`validation`] - Input checks run before any write
//! - [`ledger`] - Stock as the signed sum of movements
//! - [`showcase`] - Derived status, return validation and reconciliation
//! - [`settlement`] - Sale planning, commission modes and totals
//! - [`holdings`] - What a distributor holds and at which resale price
//!
//! ## Example Usage
//!
//! ```rust
//! use mostruario_core::showcase::{derive_status, ShowcaseLine, ShowcaseStatus};
//!
//! let lines = vec![ShowcaseLine { product_id: "p".into(), sent_quantity: 4 }];
//!
//! // No returns recorded yet
//! assert_eq!(derive_status(&lines, &[], false), ShowcaseStatus::Active);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod holdings;
pub mod ledger;
pub mod money;
pub mod settlement;
pub mod showcase;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use showcase::ShowcaseStatus;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum units of one product on a single line or movement.
///
/// Catches typos like 10000 instead of 10 before they hit the ledger.
pub const MAX_LINE_QUANTITY: i64 = 100_000;

/// Highest unit price accepted, in cents (R$ 10.000.000,00).
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000;

/// Maximum product lines in one showcase.
pub const MAX_SHOWCASE_LINES: usize = 500;

/// Maximum length of a movement reason.
pub const MAX_REASON_LENGTH: usize = 200;
