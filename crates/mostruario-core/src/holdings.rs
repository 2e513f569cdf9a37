//! Distributor holdings and showcase history read-models.
//!
//! Everything here is recomputed on every read from ledger, return and
//! sale rows handed in by the database layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::showcase::{ReconciledLine, ShowcaseStatus, ShowcaseTotals};
use crate::types::{Product, SoldProduct};

// =============================================================================
// Held Stock
// =============================================================================

/// Units of one product currently with a distributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HeldStock {
    pub product_id: String,
    pub quantity: i64,
}

/// held = sent over active showcases − units sold directly.
///
/// Products whose held quantity is not positive are left out.
pub fn compute_held(
    active_sent: &BTreeMap<String, i64>,
    direct_sold: &BTreeMap<String, i64>,
) -> Vec<HeldStock> {
    active_sent
        .iter()
        .map(|(product_id, sent)| HeldStock {
            product_id: product_id.clone(),
            quantity: sent - direct_sold.get(product_id).copied().unwrap_or(0),
        })
        .filter(|h| h.quantity > 0)
        .collect()
}

// =============================================================================
// Resale Price
// =============================================================================

/// Where a holding's resale price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    DistributorOverride,
    SellingPrice,
    CostPrice,
}

/// Override → catalog selling price → cost price.
pub fn resolve_resale_price(override_cents: Option<i64>, product: &Product) -> (Money, PriceSource) {
    if let Some(cents) = override_cents {
        return (Money::from_cents(cents), PriceSource::DistributorOverride);
    }
    match product.selling_price() {
        Some(price) => (price, PriceSource::SellingPrice),
        None => (product.cost_price(), PriceSource::CostPrice),
    }
}

/// One product a distributor holds and can resell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HoldingLine {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub quantity: i64,
    pub resale_price: Money,
    pub price_source: PriceSource,
}

impl HoldingLine {
    pub fn build(held: &HeldStock, product: &Product, override_cents: Option<i64>) -> Self {
        let (resale_price, price_source) = resolve_resale_price(override_cents, product);
        HoldingLine {
            product_id: held.product_id.clone(),
            product_code: product.code.clone(),
            product_name: product.name.clone(),
            quantity: held.quantity,
            resale_price,
            price_source,
        }
    }

    pub fn value(&self) -> Money {
        self.resale_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// History
// =============================================================================

/// One product line of a showcase as shown to the distributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryLine {
    pub product_id: String,
    pub product_code: String,
    pub product_name: String,
    pub sent: i64,
    pub returned: i64,
    pub sold: i64,
    /// Settlement data, present once the showcase is settled.
    pub unit_price: Option<Money>,
    pub commission_bps: Option<u32>,
    pub line_total: Option<Money>,
    pub commission: Option<Money>,
}

/// A showcase in the distributor-facing history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryItem {
    pub showcase_id: String,
    pub code: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Time the returns were recorded.
    #[ts(as = "Option<String>")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: ShowcaseStatus,
    pub lines: Vec<HistoryLine>,
    pub totals: ShowcaseTotals,
}

/// Joins reconciled lines with product names and sold rows.
///
/// Unknown products keep their id as the code and an empty name.
pub fn history_lines(
    reconciled: &[ReconciledLine],
    sold: &[SoldProduct],
    products: &BTreeMap<String, Product>,
) -> Vec<HistoryLine> {
    let sold_by_product: BTreeMap<&str, &SoldProduct> =
        sold.iter().map(|s| (s.product_id.as_str(), s)).collect();

    reconciled
        .iter()
        .map(|line| {
            let product = products.get(&line.product_id);
            let settled = sold_by_product.get(line.product_id.as_str());
            HistoryLine {
                product_id: line.product_id.clone(),
                product_code: product
                    .map(|p| p.code.clone())
                    .unwrap_or_else(|| line.product_id.clone()),
                product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                sent: line.sent,
                returned: line.returned,
                sold: line.sold,
                unit_price: settled.map(|s| s.unit_price()),
                commission_bps: settled.map(|s| s.commission_bps),
                line_total: settled.map(|s| s.line_total()),
                commission: settled.map(|s| s.commission()),
            }
        })
        .collect()
}

/// Unit totals plus money totals when sold rows exist.
pub fn history_totals(reconciled: &[ReconciledLine], sold: &[SoldProduct]) -> ShowcaseTotals {
    let mut totals = ShowcaseTotals::from_lines(reconciled);
    if !sold.is_empty() {
        totals.sale_total_cents = Some(sold.iter().map(SoldProduct::line_total).sum::<Money>().cents());
        totals.commission_cents = Some(sold.iter().map(SoldProduct::commission).sum::<Money>().cents());
    }
    totals
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, cost: i64, selling: Option<i64>) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            code: format!("C-{id}"),
            name: format!("Piece {id}"),
            description: None,
            category_id: None,
            cost_price_cents: cost,
            selling_price_cents: selling,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_compute_held_drops_non_positive() {
        let sent: BTreeMap<String, i64> = [("a".to_string(), 4), ("b".to_string(), 2)].into();
        let direct: BTreeMap<String, i64> = [("b".to_string(), 3)].into();

        let held = compute_held(&sent, &direct);
        assert_eq!(
            held,
            vec![HeldStock {
                product_id: "a".into(),
                quantity: 4
            }]
        );
    }

    #[test]
    fn test_price_fallback_chain() {
        let with_selling = product("p", 3000, Some(8000));
        let cost_only = product("q", 3000, None);

        assert_eq!(
            resolve_resale_price(Some(9000), &with_selling),
            (Money::from_cents(9000), PriceSource::DistributorOverride)
        );
        assert_eq!(
            resolve_resale_price(None, &with_selling),
            (Money::from_cents(8000), PriceSource::SellingPrice)
        );
        assert_eq!(
            resolve_resale_price(None, &cost_only),
            (Money::from_cents(3000), PriceSource::CostPrice)
        );
    }

    #[test]
    fn test_holding_value() {
        let held = HeldStock {
            product_id: "p".into(),
            quantity: 3,
        };
        let line = HoldingLine::build(&held, &product("p", 1000, Some(2500)), None);
        assert_eq!(line.value().cents(), 7500);
        assert_eq!(line.product_code, "C-p");
    }

    #[test]
    fn test_history_lines_with_settlement() {
        let reconciled = vec![
            ReconciledLine {
                product_id: "p".into(),
                sent: 4,
                returned: 1,
                sold: 3,
            },
            ReconciledLine {
                product_id: "q".into(),
                sent: 2,
                returned: 2,
                sold: 0,
            },
        ];
        let sold = vec![SoldProduct {
            id: "sp".into(),
            sale_id: "s".into(),
            product_id: "p".into(),
            quantity: 3,
            unit_price_cents: 10000,
            commission_bps: 1000,
            created_at: Utc::now(),
        }];
        let products: BTreeMap<String, Product> =
            [("p".to_string(), product("p", 1000, None))].into();

        let lines = history_lines(&reconciled, &sold, &products);
        assert_eq!(lines[0].line_total, Some(Money::from_cents(30000)));
        assert_eq!(lines[0].commission, Some(Money::from_cents(3000)));
        assert_eq!(lines[1].unit_price, None);
        assert_eq!(lines[1].product_code, "q");

        let totals = history_totals(&reconciled, &sold);
        assert_eq!(totals.units_sold, 3);
        assert_eq!(totals.sale_total_cents, Some(30000));
        assert_eq!(totals.commission_cents, Some(3000));

        assert_eq!(history_totals(&reconciled, &[]).sale_total_cents, None);
    }

    #[test]
    fn test_out_of_range_rows_saturate_instead_of_panicking() {
        let held = HeldStock {
            product_id: "p".into(),
            quantity: 3,
        };
        let line = HoldingLine::build(&held, &product("p", 0, None), Some(i64::MAX / 2));
        assert_eq!(line.value().cents(), i64::MAX);

        let reconciled = vec![ReconciledLine {
            product_id: "p".into(),
            sent: 3,
            returned: 0,
            sold: 3,
        }];
        let sold = vec![SoldProduct {
            id: "sp".into(),
            sale_id: "s".into(),
            product_id: "p".into(),
            quantity: 3,
            unit_price_cents: i64::MAX / 2,
            commission_bps: 1000,
            created_at: Utc::now(),
        }];
        let totals = history_totals(&reconciled, &sold);
        assert_eq!(totals.sale_total_cents, Some(i64::MAX));
    }
}
