//! # Domain Types
//!
//! Records persisted by the consignment ledger and read from the catalog.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Reference (read-only here)       Append/insert-mostly                  │
//! │  ───────────────────────────      ────────────────────────────          │
//! │  Category                         InventoryMovement  (ledger)           │
//! │  Product ── ProductPhoto          Showcase           (consignment)      │
//! │  DistributorProfile               ShowcaseReturn     (finalization)     │
//! │  ProductPricing (override)        Sale ── SoldProduct (settlement)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT Here
//! - No stock counter on `Product`: stock is the ledger sum.
//! - No status column on `Showcase`: status is derived, see
//!   [`crate::showcase::derive_status`].
//! - No commission value on `SoldProduct`: it is computed from quantity,
//!   price and rate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Commission Rate
// =============================================================================

/// Commission rate in basis points.
///
/// 1 bp = 0.01%, so 1000 = 10% and 10000 = 100%. Construction from raw
/// input goes through [`crate::validation::validate_commission_bps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommissionRate(u32);

impl CommissionRate {
    /// Highest representable rate (100%).
    pub const MAX_BPS: u32 = 10_000;

    /// Creates a rate from basis points. Caller guarantees `bps <= MAX_BPS`.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        CommissionRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    #[inline]
    pub const fn zero() -> Self {
        CommissionRate(0)
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        CommissionRate::zero()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category (rings, necklaces, earrings...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A jewelry piece in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-assigned code, unique across the catalog (e.g. "AN-0042").
    pub code: String,

    pub name: String,

    pub description: Option<String>,

    pub category_id: Option<String>,

    /// What the piece cost the wholesaler, in cents.
    pub cost_price_cents: i64,

    /// Catalog selling price, in cents. Optional for pieces priced per deal.
    pub selling_price_cents: Option<i64>,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }

    #[inline]
    pub fn selling_price(&self) -> Option<Money> {
        self.selling_price_cents.map(Money::from_cents)
    }
}

/// A photo attached to a product. Storage lives elsewhere; only the URL is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductPhoto {
    pub id: String,
    pub product_id: String,
    pub url: String,
    pub position: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Product list entry with its ledger-derived stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductWithStock {
    pub product: Product,
    pub category_name: Option<String>,
    pub photos: Vec<ProductPhoto>,
    /// Sum of all ledger movements for this product.
    pub current_stock: i64,
}

// =============================================================================
// Distributors
// =============================================================================

/// A distributor (revendedora) who receives showcases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct DistributorProfile {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Per-distributor resale price override for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductPricing {
    pub distributor_id: String,
    pub product_id: String,
    pub resale_price_cents: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ProductPricing {
    #[inline]
    pub fn resale_price(&self) -> Money {
        Money::from_cents(self.resale_price_cents)
    }
}

// =============================================================================
// Ledger
// =============================================================================

/// One signed stock change. Immutable once written.
///
/// ## Sign Convention
/// ```text
/// quantity > 0   stock in  (purchase, restock, returned pieces)
/// quantity < 0   stock out (showcase shipment, loss, direct exit)
/// quantity = 0   rejected
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,
    pub quantity: i64,
    pub reason: String,
    /// Set when the movement belongs to a showcase.
    pub showcase_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl InventoryMovement {
    #[inline]
    pub fn is_outgoing(&self) -> bool {
        self.quantity < 0
    }
}

// =============================================================================
// Showcases
// =============================================================================

/// A batch of pieces consigned to one distributor.
///
/// The shipped lines are the showcase's negative ledger movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Showcase {
    pub id: String,
    /// Generated code, e.g. "MST-20261019-0003".
    pub code: String,
    pub distributor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// How many units of one product came back from a showcase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ShowcaseReturn {
    pub id: String,
    pub showcase_id: String,
    pub product_id: String,
    pub returned_quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Settlement
// =============================================================================

/// Settlement of a finalized showcase, or a direct sale when `showcase_id` is None.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub showcase_id: Option<String>,
    pub distributor_id: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A sold line. Quantity and price are frozen at creation; only the
/// commission rate may change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SoldProduct {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub commission_bps: u32,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SoldProduct {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn commission_rate(&self) -> CommissionRate {
        CommissionRate::from_bps(self.commission_bps)
    }

    /// quantity × unit price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// quantity × unit price × rate, never stored.
    pub fn commission(&self) -> Money {
        self.line_total().calculate_commission(self.commission_rate())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commission_rate() {
        let rate = CommissionRate::from_bps(1250);
        assert_eq!(rate.bps(), 1250);
        assert!((rate.percentage() - 12.5).abs() < 0.001);
        assert_eq!(CommissionRate::default(), CommissionRate::zero());
    }

    #[test]
    fn test_sold_product_commission_is_computed() {
        let line = SoldProduct {
            id: "sp".into(),
            sale_id: "s".into(),
            product_id: "p".into(),
            quantity: 3,
            unit_price_cents: 10000,
            commission_bps: 1000,
            created_at: Utc::now(),
        };
        assert_eq!(line.line_total().cents(), 30000);
        assert_eq!(line.commission().cents(), 3000);
    }

    #[test]
    fn test_movement_direction() {
        let movement = InventoryMovement {
            id: "m".into(),
            product_id: "p".into(),
            quantity: -4,
            reason: "Showcase".into(),
            showcase_id: Some("sc".into()),
            created_at: Utc::now(),
        };
        assert!(movement.is_outgoing());
    }
}
