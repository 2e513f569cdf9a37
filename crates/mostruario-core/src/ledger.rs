//! # Inventory Ledger Math
//!
//! Stock is never stored. It is always the signed sum of a product's
//! movements, and these helpers are the only place that sum is defined
//! outside of SQL.
//!
//! ```text
//! movements(RG-001):  +10 purchase
//!                      -4 showcase MST-20261019-0001
//!                      +2 restock
//!                     ───
//! current_stock     =   8
//! ```

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::types::InventoryMovement;

/// Reason written on the outgoing movements of a showcase.
pub const SHOWCASE_SHIPMENT_REASON: &str = "Envio de mostruário";

/// Reason written on restock movements when returned pieces go back to stock.
pub const SHOWCASE_RESTOCK_REASON: &str = "Retorno de mostruário";

/// Signed sum of the given movements.
pub fn current_stock<'a>(movements: impl IntoIterator<Item = &'a InventoryMovement>) -> i64 {
    movements.into_iter().map(|m| m.quantity).sum()
}

/// Ledger sum per product.
pub fn stock_by_product<'a>(
    movements: impl IntoIterator<Item = &'a InventoryMovement>,
) -> BTreeMap<String, i64> {
    let mut stock = BTreeMap::new();
    for movement in movements {
        *stock.entry(movement.product_id.clone()).or_insert(0) += movement.quantity;
    }
    stock
}

/// Units shipped per product, from a showcase's outgoing movements.
///
/// Positive movements tagged with the showcase (restocked returns) are
/// ignored, so the result is the same whether or not returns were restocked.
pub fn sent_by_product<'a>(
    movements: impl IntoIterator<Item = &'a InventoryMovement>,
) -> BTreeMap<String, i64> {
    let mut sent = BTreeMap::new();
    for movement in movements.into_iter().filter(|m| m.is_outgoing()) {
        *sent.entry(movement.product_id.clone()).or_insert(0) += -movement.quantity;
    }
    sent
}

/// Admission control for an outgoing quantity.
///
/// ## Example
/// ```rust
/// use mostruario_core::ledger::check_admission;
///
/// assert!(check_admission("RG-001", 5, 4).is_ok());
/// assert!(check_admission("RG-001", 3, 4).is_err());
/// ```
pub fn check_admission(code: &str, available: i64, requested: i64) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::InsufficientStock {
            code: code.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
