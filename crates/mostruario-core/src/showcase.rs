//! # Showcase Lifecycle
//!
//! Status derivation, request validation and return reconciliation for
//! consigned showcases (mostruários).
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create()            finish()                 register_sale()          │
//! │      │                   │                           │                  │
//! │      ▼                   ▼                           ▼                  │
//! │  ┌────────┐  returns  ┌───────────┐   sale row   ┌─────────┐            │
//! │  │ Active │ ────────► │ Finalized │ ───────────► │ Settled │            │
//! │  └────────┘  written  └───────────┘              └─────────┘            │
//! │                  │                                                      │
//! │                  │ every unit returned                                  │
//! │                  ▼                                                      │
//! │          ┌─────────────────┐                                            │
//! │          │ FinalizedNoSale │  (terminal)                                │
//! │          └─────────────────┘                                            │
//! │                                                                         │
//! │  Nothing is stored: the state is read off returns + sale rows by        │
//! │  derive_status(), and every caller goes through that one function.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{Showcase, ShowcaseReturn};
use crate::validation::{
    require_exact_products, unique_product_ids, validate_date_range, validate_line_count,
    validate_line_quantity, ValidationResult,
};

// =============================================================================
// Status
// =============================================================================

/// Derived lifecycle state of a showcase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShowcaseStatus {
    /// Pieces are with the distributor; no returns recorded.
    Active,
    /// Returns recorded, sold units await settlement.
    Finalized,
    /// Returns recorded and every unit came back.
    FinalizedNoSale,
    /// A sale references the showcase.
    Settled,
}

impl ShowcaseStatus {
    /// Terminal states accept no further lifecycle operation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShowcaseStatus::Settled | ShowcaseStatus::FinalizedNoSale)
    }

    /// Returns have been recorded.
    pub fn is_finalized(&self) -> bool {
        !matches!(self, ShowcaseStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShowcaseStatus::Active => "active",
            ShowcaseStatus::Finalized => "finalized",
            ShowcaseStatus::FinalizedNoSale => "finalized_no_sale",
            ShowcaseStatus::Settled => "settled",
        }
    }
}

impl fmt::Display for ShowcaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShowcaseStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ShowcaseStatus::Active),
            "finalized" => Ok(ShowcaseStatus::Finalized),
            "finalized_no_sale" => Ok(ShowcaseStatus::FinalizedNoSale),
            "settled" => Ok(ShowcaseStatus::Settled),
            other => Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!(
                    "unknown status '{}', expected active, finalized, finalized_no_sale or settled",
                    other
                ),
            }),
        }
    }
}

/// One shipped product line, derived from the showcase's outgoing movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShowcaseLine {
    pub product_id: String,
    pub sent_quantity: i64,
}

/// Builds shipped lines from the per-product sent map.
pub fn lines_from_sent(sent: BTreeMap<String, i64>) -> Vec<ShowcaseLine> {
    sent.into_iter()
        .map(|(product_id, sent_quantity)| ShowcaseLine {
            product_id,
            sent_quantity,
        })
        .collect()
}

/// The single status derivation used everywhere.
///
/// ## Rules
/// - No return rows → Active
/// - Sale exists → Settled
/// - Σ(sent − returned) = 0 → FinalizedNoSale
/// - otherwise → Finalized
///
/// ## Example
/// ```rust
/// use mostruario_core::showcase::{derive_status, ShowcaseLine, ShowcaseStatus};
///
/// let lines = vec![ShowcaseLine { product_id: "p".into(), sent_quantity: 4 }];
/// assert_eq!(derive_status(&lines, &[], false), ShowcaseStatus::Active);
/// ```
pub fn derive_status(
    lines: &[ShowcaseLine],
    returns: &[ShowcaseReturn],
    has_sale: bool,
) -> ShowcaseStatus {
    if returns.is_empty() {
        return ShowcaseStatus::Active;
    }

    if has_sale {
        return ShowcaseStatus::Settled;
    }

    let total_sold: i64 = reconcile(lines, returns).iter().map(|l| l.sold).sum();
    if total_sold == 0 {
        ShowcaseStatus::FinalizedNoSale
    } else {
        ShowcaseStatus::Finalized
    }
}

// =============================================================================
// Reconciliation
// =============================================================================

/// The (sent, returned, sold) triple for one product of a showcase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciledLine {
    pub product_id: String,
    pub sent: i64,
    pub returned: i64,
    /// sent − returned
    pub sold: i64,
}

/// Joins shipped lines with return rows.
///
/// Lines without a return row count as nothing returned.
pub fn reconcile(lines: &[ShowcaseLine], returns: &[ShowcaseReturn]) -> Vec<ReconciledLine> {
    let returned: BTreeMap<&str, i64> = returns
        .iter()
        .map(|r| (r.product_id.as_str(), r.returned_quantity))
        .collect();

    lines
        .iter()
        .map(|line| {
            let returned = returned
                .get(line.product_id.as_str())
                .copied()
                .unwrap_or(0);
            ReconciledLine {
                product_id: line.product_id.clone(),
                sent: line.sent_quantity,
                returned,
                sold: line.sent_quantity - returned,
            }
        })
        .collect()
}

// =============================================================================
// Requests
// =============================================================================

/// One product line of a new showcase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShowcaseLineInput {
    pub product_id: String,
    pub quantity: i64,
}

/// Input to `create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreateShowcaseRequest {
    pub distributor_id: String,
    pub lines: Vec<ShowcaseLineInput>,
}

impl CreateShowcaseRequest {
    /// Shape checks: non-empty, bounded, positive quantities, no duplicates.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.distributor_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "distributor_id".to_string(),
            });
        }

        validate_line_count("lines", self.lines.len())?;

        for line in &self.lines {
            validate_line_quantity(line.quantity)?;
        }

        unique_product_ids("lines", self.lines.iter().map(|l| l.product_id.as_str()))?;

        Ok(())
    }
}

/// How many units of one product came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnLineInput {
    pub product_id: String,
    pub returned_quantity: i64,
}

/// Checks a return set against the shipped lines.
///
/// ## Rules
/// - Covers exactly the shipped products, once each
/// - 0 ≤ returned ≤ sent for every line
pub fn validate_returns(lines: &[ShowcaseLine], returns: &[ReturnLineInput]) -> ValidationResult<()> {
    let expected = lines.iter().map(|l| l.product_id.clone()).collect();
    require_exact_products(
        "returns",
        &expected,
        returns.iter().map(|r| r.product_id.as_str()),
    )?;

    let sent: BTreeMap<&str, i64> = lines
        .iter()
        .map(|l| (l.product_id.as_str(), l.sent_quantity))
        .collect();

    for ret in returns {
        let max = sent.get(ret.product_id.as_str()).copied().unwrap_or(0);
        if ret.returned_quantity < 0 || ret.returned_quantity > max {
            return Err(ValidationError::OutOfRange {
                field: format!("returned_quantity for {}", ret.product_id),
                min: 0,
                max,
            });
        }
    }

    Ok(())
}

// =============================================================================
// Listing
// =============================================================================

/// Inclusive created-at window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> ValidationResult<Self> {
        validate_date_range(from, to)?;
        Ok(DateRange { from, to })
    }

    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

/// Optional filters for listing showcases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShowcaseFilter {
    pub distributor_id: Option<String>,
    pub status: Option<ShowcaseStatus>,
    pub created: Option<DateRange>,
}

impl ShowcaseFilter {
    pub fn matches(&self, showcase: &Showcase, status: ShowcaseStatus) -> bool {
        if let Some(ref distributor_id) = self.distributor_id {
            if &showcase.distributor_id != distributor_id {
                return false;
            }
        }
        if let Some(wanted) = self.status {
            if wanted != status {
                return false;
            }
        }
        if let Some(range) = self.created {
            if !range.contains(showcase.created_at) {
                return false;
            }
        }
        true
    }
}

/// Unit and money totals for a showcase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShowcaseTotals {
    pub units_sent: i64,
    pub units_returned: i64,
    pub units_sold: i64,
    /// Present once settled.
    pub sale_total_cents: Option<i64>,
    /// Present once settled.
    pub commission_cents: Option<i64>,
}

impl ShowcaseTotals {
    /// Unit totals from reconciled lines; money totals are filled in by the caller.
    pub fn from_lines(lines: &[ReconciledLine]) -> Self {
        ShowcaseTotals {
            units_sent: lines.iter().map(|l| l.sent).sum(),
            units_returned: lines.iter().map(|l| l.returned).sum(),
            units_sold: lines.iter().map(|l| l.sold).sum(),
            sale_total_cents: None,
            commission_cents: None,
        }
    }
}

/// List entry returned by `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShowcaseSummary {
    pub showcase: Showcase,
    pub distributor_name: String,
    pub status: ShowcaseStatus,
    pub totals: ShowcaseTotals,
}

// =============================================================================
// Unit Tests
// =============================================================================
