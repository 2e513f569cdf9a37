//! # Holdings Repository
//!
//! Distributor-facing read models. Nothing here is stored: each call
//! reloads showcases, returns and sales and recomputes. Every call reads
//! inside one transaction, so a view never mixes rows from before and
//! after a concurrent finish or sale.
//!
//! ```text
//! held(product) = Σ sent over the distributor's Active showcases
//!               − Σ direct-sale units since the oldest Active showcase
//!               (lines ≤ 0 dropped)
//! ```

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::debug;

use crate::error::DbResult;
use crate::pool::with_deadline;
use crate::repository::distributor::fetch_distributor;
use crate::repository::product::fetch_products_by_ids;
use crate::repository::showcase::load_states;
use mostruario_core::holdings::{compute_held, history_lines, HeldStock, HistoryItem, HoldingLine};
use mostruario_core::showcase::DateRange;
use mostruario_core::{CoreError, Product, ShowcaseStatus};

/// Repository for holdings and history views.
#[derive(Debug, Clone)]
pub struct HoldingsRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl HoldingsRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        HoldingsRepository { pool, timeout }
    }

    /// Units the distributor still has in hand, per product.
    pub async fn distributor_held_stock(&self, distributor_id: &str) -> DbResult<Vec<HeldStock>> {
        with_deadline(self.timeout, "holdings.held_stock", async {
            let mut tx = self.pool.begin().await?;
            let held = held_stock(&mut tx, distributor_id).await?;
            tx.commit().await?;
            Ok(held)
        })
        .await
    }

    /// Held stock with product details and the resale price that applies.
    ///
    /// Price resolution: distributor override, then catalog selling price,
    /// then cost price.
    pub async fn distributor_holdings(&self, distributor_id: &str) -> DbResult<Vec<HoldingLine>> {
        with_deadline(self.timeout, "holdings.holdings", async {
            let mut tx = self.pool.begin().await?;
            let held = held_stock(&mut tx, distributor_id).await?;
            if held.is_empty() {
                tx.commit().await?;
                return Ok(Vec::new());
            }

            let products =
                fetch_products_by_ids(&mut tx, held.iter().map(|h| h.product_id.as_str())).await?;

            let overrides: HashMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
                r#"
                SELECT product_id, resale_price_cents
                FROM product_pricing
                WHERE distributor_id = ?1
                "#,
            )
            .bind(distributor_id)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();
            tx.commit().await?;

            let lines: Vec<HoldingLine> = held
                .iter()
                .filter_map(|h| {
                    let product = products.get(&h.product_id)?;
                    Some(HoldingLine::build(
                        h,
                        product,
                        overrides.get(&h.product_id).copied(),
                    ))
                })
                .collect();

            debug!(distributor_id = %distributor_id, lines = lines.len(), "Holdings computed");
            Ok(lines)
        })
        .await
    }

    /// Every showcase of the distributor with reconciliation and settlement, newest first.
    ///
    /// `created` limits the result to showcases created inside the range.
    pub async fn showcase_history(
        &self,
        distributor_id: &str,
        created: Option<DateRange>,
    ) -> DbResult<Vec<HistoryItem>> {
        with_deadline(self.timeout, "holdings.history", async {
            let mut tx = self.pool.begin().await?;
            if fetch_distributor(&mut *tx, distributor_id).await?.is_none() {
                return Err(CoreError::DistributorNotFound(distributor_id.to_string()).into());
            }

            let states: Vec<_> = load_states(&mut tx, Some(distributor_id), None)
                .await?
                .into_iter()
                .filter(|s| created.map_or(true, |range| range.contains(s.showcase.created_at)))
                .collect();

            let products: BTreeMap<String, Product> = fetch_products_by_ids(
                &mut tx,
                states
                    .iter()
                    .flat_map(|s| s.lines.iter().map(|l| l.product_id.as_str())),
            )
            .await?
            .into_iter()
            .collect();
            tx.commit().await?;

            let history: Vec<HistoryItem> = states
                .into_iter()
                .map(|state| {
                    let reconciled = state.reconciled();
                    HistoryItem {
                        showcase_id: state.showcase.id.clone(),
                        code: state.showcase.code.clone(),
                        created_at: state.showcase.created_at,
                        finished_at: state.finished_at(),
                        status: state.status(),
                        lines: history_lines(&reconciled, &state.sold, &products),
                        totals: state.totals(),
                    }
                })
                .collect();

            debug!(distributor_id = %distributor_id, items = history.len(), "History loaded");
            Ok(history)
        })
        .await
    }
}

async fn held_stock(conn: &mut SqliteConnection, distributor_id: &str) -> DbResult<Vec<HeldStock>> {
    if fetch_distributor(&mut *conn, distributor_id).await?.is_none() {
        return Err(CoreError::DistributorNotFound(distributor_id.to_string()).into());
    }

    let active: Vec<_> = load_states(&mut *conn, Some(distributor_id), None)
        .await?
        .into_iter()
        .filter(|s| s.status() == ShowcaseStatus::Active)
        .collect();

    let Some(oldest) = active.iter().map(|s| s.showcase.created_at).min() else {
        return Ok(Vec::new());
    };

    let mut sent: BTreeMap<String, i64> = BTreeMap::new();
    for line in active.iter().flat_map(|s| &s.lines) {
        *sent.entry(line.product_id.clone()).or_insert(0) += line.sent_quantity;
    }

    let direct_rows: Vec<(String, i64, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT sp.product_id, sp.quantity, sa.created_at
        FROM sold_products sp
        JOIN sales sa ON sa.id = sp.sale_id
        WHERE sa.distributor_id = ?1 AND sa.showcase_id IS NULL
        "#,
    )
    .bind(distributor_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut direct: BTreeMap<String, i64> = BTreeMap::new();
    for (product_id, quantity, created_at) in direct_rows {
        if created_at >= oldest {
            *direct.entry(product_id).or_insert(0) += quantity;
        }
    }

    Ok(compute_held(&sent, &direct))
}

// =============================================================================
// Unit Tests
// =============================================================================
