//! # Sale & Commission Settlement
//!
//! Turns a finalized showcase's unreturned units into sold lines.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reconcile(lines, returns)        RegisterSaleRequest                   │
//! │        │                               │                                │
//! │        │ sold per product              │ price + commission per line    │
//! │        └──────────────┬────────────────┘                                │
//! │                       ▼                                                 │
//! │               plan_settlement()                                         │
//! │   ├── commission mode consistent (global XOR per-line)                  │
//! │   ├── lines == { products with sold > 0 }                               │
//! │   ├── 0 ≤ price ≤ MAX_PRICE_CENTS, 0 ≤ bps ≤ 10000                      │
//! │   ├── quantity taken from reconciliation, never from the caller         │
//! │   └── totals computed with checked arithmetic                           │
//! │                       │                                                 │
//! │                       ▼                                                 │
//! │            Vec<PlannedSoldProduct> ──► one Sale + N SoldProduct rows    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::showcase::ReconciledLine;
use crate::types::{CommissionRate, Sale, SoldProduct};
use crate::validation::{
    require_exact_products, unique_product_ids, validate_commission_bps, validate_line_count,
    validate_price_cents, ValidationResult,
};

/// Longest sale description accepted.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

// =============================================================================
// Requests
// =============================================================================

/// How commission percentages are supplied for a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CommissionMode {
    /// One rate for every line; lines carry none.
    Global { commission_bps: i64 },
    /// Every line carries its own rate.
    PerLine,
}

impl CommissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionMode::Global { .. } => "global",
            CommissionMode::PerLine => "per_line",
        }
    }
}

/// Price and (per-line mode) commission for one sold product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineInput {
    pub product_id: String,
    pub unit_price_cents: i64,
    pub commission_bps: Option<i64>,
}

/// Input to `register_sale`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegisterSaleRequest {
    pub showcase_id: String,
    pub lines: Vec<SaleLineInput>,
    pub mode: CommissionMode,
    pub description: Option<String>,
}

impl RegisterSaleRequest {
    /// Input-only checks, independent of the showcase's state.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_line_count("lines", self.lines.len())?;
        unique_product_ids("lines", self.lines.iter().map(|l| l.product_id.as_str()))?;

        if let Some(ref description) = self.description {
            if description.chars().count() > MAX_DESCRIPTION_LENGTH {
                return Err(ValidationError::TooLong {
                    field: "description".to_string(),
                    max: MAX_DESCRIPTION_LENGTH,
                });
            }
        }

        if let CommissionMode::Global { commission_bps } = self.mode {
            validate_commission_bps(commission_bps)?;
        }

        for line in &self.lines {
            validate_price_cents("unit_price", line.unit_price_cents)?;
            self.line_rate(line)?;
        }

        Ok(())
    }

    /// Resolves the rate for a line under the declared mode.
    pub fn line_rate(&self, line: &SaleLineInput) -> ValidationResult<CommissionRate> {
        match (self.mode, line.commission_bps) {
            (CommissionMode::Global { commission_bps }, None) => {
                validate_commission_bps(commission_bps)
            }
            (CommissionMode::PerLine, Some(bps)) => validate_commission_bps(bps),
            (CommissionMode::Global { .. }, Some(_)) => Err(ValidationError::CommissionModeMismatch {
                mode: self.mode.as_str().to_string(),
                product_id: line.product_id.clone(),
                reason: "line carries its own commission under a global rate".to_string(),
            }),
            (CommissionMode::PerLine, None) => Err(ValidationError::CommissionModeMismatch {
                mode: self.mode.as_str().to_string(),
                product_id: line.product_id.clone(),
                reason: "line has no commission".to_string(),
            }),
        }
    }

    /// Trimmed description, `None` when blank.
    pub fn normalized_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    }
}

// =============================================================================
// Planning
// =============================================================================

/// A sold line ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSoldProduct {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub rate: CommissionRate,
}

/// Builds the sold lines for a settlement.
///
/// `reconciled` must come from a finalized showcase. Quantities are the
/// reconciled sold counts; the request only contributes prices and rates.
///
/// ## Errors
/// - `Validation` for malformed input or a line set that differs from the
///   products with sold > 0
/// - `NothingToSettle` when every unit came back
pub fn plan_settlement(
    showcase_id: &str,
    reconciled: &[ReconciledLine],
    request: &RegisterSaleRequest,
) -> CoreResult<Vec<PlannedSoldProduct>> {
    request.validate()?;

    let sold: BTreeMap<&str, i64> = reconciled
        .iter()
        .filter(|l| l.sold > 0)
        .map(|l| (l.product_id.as_str(), l.sold))
        .collect();

    if sold.is_empty() {
        return Err(CoreError::NothingToSettle(showcase_id.to_string()));
    }

    let expected = sold.keys().map(|id| id.to_string()).collect();
    require_exact_products(
        "lines",
        &expected,
        request.lines.iter().map(|l| l.product_id.as_str()),
    )?;

    let mut planned = Vec::with_capacity(request.lines.len());
    for line in &request.lines {
        let quantity = sold.get(line.product_id.as_str()).copied().unwrap_or(0);
        planned.push(PlannedSoldProduct {
            product_id: line.product_id.clone(),
            quantity,
            unit_price: Money::from_cents(line.unit_price_cents),
            rate: request.line_rate(line)?,
        });
    }

    SaleTotals::try_from_planned(&planned)?;
    Ok(planned)
}

// =============================================================================
// Commission Updates
// =============================================================================

/// New rate for one existing sold line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CommissionUpdate {
    pub sold_product_id: String,
    pub commission_bps: i64,
}

/// Validates every update before anything is written.
pub fn validate_commission_updates(
    updates: &[CommissionUpdate],
) -> ValidationResult<Vec<(String, CommissionRate)>> {
    if updates.is_empty() {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    unique_product_ids("lines", updates.iter().map(|u| u.sold_product_id.as_str()))?;

    let mut rates = Vec::with_capacity(updates.len());
    for update in updates {
        let rate = validate_commission_bps(update.commission_bps)?;
        rates.push((update.sold_product_id.clone(), rate));
    }
    Ok(rates)
}

// =============================================================================
// Totals
// =============================================================================

/// Totals computed from sold lines; never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleTotals {
    pub units: i64,
    pub total: Money,
    pub commission: Money,
}

impl SaleTotals {
    pub fn from_items(items: &[SoldProduct]) -> Self {
        SaleTotals {
            units: items.iter().map(|i| i.quantity).sum(),
            total: items.iter().map(SoldProduct::line_total).sum(),
            commission: items.iter().map(SoldProduct::commission).sum(),
        }
    }

    /// Totals for lines about to be written. Fails instead of saturating.
    pub fn try_from_planned(lines: &[PlannedSoldProduct]) -> ValidationResult<Self> {
        let overflow = |field: &str| ValidationError::AmountOverflow {
            field: field.to_string(),
        };

        let mut totals = SaleTotals::default();
        for line in lines {
            let line_total = line
                .unit_price
                .checked_multiply_quantity(line.quantity)
                .ok_or_else(|| overflow("line total"))?;
            totals.units = totals
                .units
                .checked_add(line.quantity)
                .ok_or_else(|| overflow("units"))?;
            totals.total = totals
                .total
                .checked_add(line_total)
                .ok_or_else(|| overflow("total"))?;
            totals.commission = totals
                .commission
                .checked_add(line_total.calculate_commission(line.rate))
                .ok_or_else(|| overflow("commission"))?;
        }
        Ok(totals)
    }
}

/// A sale with its lines and computed totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleSummary {
    pub sale: Sale,
    pub items: Vec<SoldProduct>,
    pub totals: SaleTotals,
}

impl SaleSummary {
    pub fn new(sale: Sale, items: Vec<SoldProduct>) -> Self {
        let totals = SaleTotals::from_items(&items);
        SaleSummary { sale, items, totals }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
