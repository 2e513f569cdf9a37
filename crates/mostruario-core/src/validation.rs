//! # Validation Module
//!
//! Input checks that run before anything touches the database.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Admin UI                                                      │
//! │  └── Basic format checks, immediate feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── Quantities, reasons, codes, commission rates                       │
//! │  └── Line-set checks (duplicates, missing/extra products)               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  ├── CHECK (quantity <> 0), CHECK (commission_bps BETWEEN 0 AND 10000)  │
//! │  └── UNIQUE (showcase_id, product_id), UNIQUE sales(showcase_id)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::ValidationError;
use crate::types::CommissionRate;
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS, MAX_REASON_LENGTH, MAX_SHOWCASE_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens and underscores only
///
/// ## Example
/// ```rust
/// use mostruario_core::validation::validate_product_code;
///
/// assert!(validate_product_code("AN-0042").is_ok());
/// assert!(validate_product_code("").is_err());
/// assert!(validate_product_code("has space").is_err());
/// ```
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a display name (product, category, distributor).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a movement reason and returns it trimmed.
///
/// ## Example
/// ```rust
/// use mostruario_core::validation::validate_reason;
///
/// assert_eq!(validate_reason("  Purchase  ").unwrap(), "Purchase");
/// assert!(validate_reason("   ").is_err());
/// ```
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.chars().count() > MAX_REASON_LENGTH {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LENGTH,
        });
    }

    Ok(reason.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a signed ledger quantity.
///
/// ## Rules
/// - Must not be zero (a zero movement is a no-op and is rejected)
/// - Magnitude must not exceed MAX_LINE_QUANTITY
///
/// Sign is not checked here: the caller decides stock-in vs stock-out.
pub fn validate_movement_quantity(qty: i64) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "quantity".to_string(),
        });
    }

    if qty.unsigned_abs() > MAX_LINE_QUANTITY as u64 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: -MAX_LINE_QUANTITY,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a showcase line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_line_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Zero allowed, negative rejected
/// - Must not exceed MAX_PRICE_CENTS, which keeps `price × MAX_LINE_QUANTITY`
///   well inside `i64`
///
/// ## Example
/// ```rust
/// use mostruario_core::validation::validate_price_cents;
/// use mostruario_core::MAX_PRICE_CENTS;
///
/// assert!(validate_price_cents("unit_price", 0).is_ok());
/// assert!(validate_price_cents("unit_price", MAX_PRICE_CENTS).is_ok());
/// assert!(validate_price_cents("unit_price", MAX_PRICE_CENTS + 1).is_err());
/// assert!(validate_price_cents("unit_price", -1).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Validates a commission in basis points and converts it.
///
/// Out-of-range values are errors; they are never clamped.
///
/// ## Example
/// ```rust
/// use mostruario_core::validation::validate_commission_bps;
///
/// assert_eq!(validate_commission_bps(1000).unwrap().bps(), 1000);
/// assert!(validate_commission_bps(-1).is_err());
/// assert!(validate_commission_bps(10001).is_err());
/// ```
pub fn validate_commission_bps(bps: i64) -> ValidationResult<CommissionRate> {
    if !(0..=CommissionRate::MAX_BPS as i64).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "commission".to_string(),
            min: 0,
            max: CommissionRate::MAX_BPS as i64,
        });
    }

    Ok(CommissionRate::from_bps(bps as u32))
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a request.
pub fn validate_line_count(field: &str, count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if count > MAX_SHOWCASE_LINES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_SHOWCASE_LINES as i64,
        });
    }

    Ok(())
}

/// Rejects a product listed twice and returns the set of ids.
pub fn unique_product_ids<'a>(
    field: &str,
    product_ids: impl IntoIterator<Item = &'a str>,
) -> ValidationResult<BTreeSet<String>> {
    let mut seen = BTreeSet::new();
    for id in product_ids {
        if !seen.insert(id.to_string()) {
            return Err(ValidationError::DuplicateProduct {
                field: field.to_string(),
                product_id: id.to_string(),
            });
        }
    }
    Ok(seen)
}

/// Checks that `given` lists exactly the products in `expected`, once each.
///
/// ## Example
/// ```rust
/// use std::collections::BTreeSet;
/// use mostruario_core::validation::require_exact_products;
///
/// let expected: BTreeSet<String> = ["a".to_string(), "b".to_string()].into();
/// assert!(require_exact_products("returns", &expected, ["b", "a"]).is_ok());
/// assert!(require_exact_products("returns", &expected, ["a"]).is_err());
/// assert!(require_exact_products("returns", &expected, ["a", "b", "c"]).is_err());
/// ```
pub fn require_exact_products<'a>(
    field: &str,
    expected: &BTreeSet<String>,
    given: impl IntoIterator<Item = &'a str>,
) -> ValidationResult<()> {
    let given = unique_product_ids(field, given)?;

    if &given == expected {
        return Ok(());
    }

    Err(ValidationError::LineSetMismatch {
        field: field.to_string(),
        missing: expected.difference(&given).cloned().collect(),
        unexpected: given.difference(expected).cloned().collect(),
    })
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that a date range is not inverted.
pub fn validate_date_range(from: DateTime<Utc>, to: DateTime<Utc>) -> ValidationResult<()> {
    if from > to {
        return Err(ValidationError::InvalidFormat {
            field: "date range".to_string(),
            reason: "start must not be after end".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
