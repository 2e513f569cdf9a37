//! # Error Types
//!
//! Domain-specific error types for mostruario-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  mostruario-core errors (this file)                                    │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  └── ErrorKind        - What the caller should do about it             │
//! │                                                                         │
//! │  mostruario-db errors (separate crate)                                 │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → UI (via ErrorKind)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Kinds
//! ```text
//! Validation  → fix your input and resend
//! Conflict    → state changed under you, reload and retry
//! NotFound    → the referenced record is gone
//! Transport   → timeout/connectivity, safe to retry as-is
//! Internal    → bug or storage corruption
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification of every error surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Input was malformed. Nothing was written.
    Validation,
    /// The request conflicts with current state. Nothing was written.
    Conflict,
    /// A referenced id does not exist.
    NotFound,
    /// Timeout or connectivity failure. Retryable.
    Transport,
    /// Unexpected failure.
    Internal,
}

impl ErrorKind {
    /// Whether the same request may succeed if simply sent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transport)
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Distributor not found: {0}")]
    DistributorNotFound(String),

    /// Showcases can only be sent to active distributors.
    #[error("Distributor {0} is inactive")]
    DistributorInactive(String),

    #[error("Showcase not found: {0}")]
    ShowcaseNotFound(String),

    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// The sold product row does not exist or belongs to another sale.
    #[error("Sold product {sold_product_id} does not belong to sale {sale_id}")]
    SoldProductNotFound {
        sale_id: String,
        sold_product_id: String,
    },

    /// Outgoing movement larger than the ledger balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Create showcase (ring RG-001 × 4)
    ///      │
    ///      ▼
    /// Ledger sum for RG-001 = 3
    ///      │
    ///      ▼
    /// InsufficientStock { code: "RG-001", available: 3, requested: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Only 3 RG-001 in stock" and reloads stock
    /// ```
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// Return rows already exist for this showcase.
    #[error("Showcase {0} is already finalized")]
    ShowcaseAlreadyFinalized(String),

    /// Settlement requires the returns to be recorded first.
    #[error("Showcase {0} is still active, record returns first")]
    ShowcaseNotFinalized(String),

    /// Every unit came back; there is nothing to sell.
    #[error("Showcase {0} has no sold units to settle")]
    NothingToSettle(String),

    /// A sale already references this showcase.
    #[error("Showcase {0} already has a sale")]
    DuplicateSale(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::ProductNotFound(_)
            | CoreError::DistributorNotFound(_)
            | CoreError::ShowcaseNotFound(_)
            | CoreError::SaleNotFound(_)
            | CoreError::SoldProductNotFound { .. } => ErrorKind::NotFound,
            CoreError::DistributorInactive(_)
            | CoreError::InsufficientStock { .. }
            | CoreError::ShowcaseAlreadyFinalized(_)
            | CoreError::ShowcaseNotFinalized(_)
            | CoreError::NothingToSettle(_)
            | CoreError::DuplicateSale(_) => ErrorKind::Conflict,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write happens.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// The same product appears twice in one request.
    #[error("{field} lists product {product_id} more than once")]
    DuplicateProduct { field: String, product_id: String },

    /// The request's line set differs from the set it must match.
    #[error("{field} does not match: missing {missing:?}, unexpected {unexpected:?}")]
    LineSetMismatch {
        field: String,
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// A computed amount does not fit in the money type.
    #[error("{field} is too large")]
    AmountOverflow { field: String },

    /// Global and per-line commission inputs were combined.
    #[error("commission mode {mode} conflicts with line {product_id}: {reason}")]
    CommissionModeMismatch {
        mode: String,
        product_id: String,
        reason: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
