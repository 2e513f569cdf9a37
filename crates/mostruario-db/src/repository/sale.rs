//! # Sale Repository
//!
//! Settlement of finished showcases and later commission edits.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  RegisterSaleRequest                                                    │
//! │       │ validate (mode, rates, prices, duplicates)                      │
//! │       ▼                                                                 │
//! │  load showcase state ──► Active?        → ShowcaseNotFinalized          │
//! │       │                  sale exists?   → DuplicateSale                 │
//! │       ▼                                                                 │
//! │  plan_settlement(reconciled lines)                                      │
//! │       │ quantities come from sent − returned, never from the caller     │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │    INSERT sales          ── unique showcase_id hit → DuplicateSale      │
//! │    INSERT sold_products × N                                             │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{is_unique_violation, DbResult};
use crate::pool::with_deadline;
use crate::repository::showcase::load_state;
use mostruario_core::settlement::{
    plan_settlement, validate_commission_updates, CommissionUpdate, RegisterSaleRequest,
    SaleSummary, SaleTotals,
};
use mostruario_core::{CoreError, Sale, SoldProduct};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        SaleRepository { pool, timeout }
    }

    /// Settles a finished showcase.
    ///
    /// ## Errors
    /// * `Validation` - mode/rate mismatch, rate out of 0..=10000 bps,
    ///   price outside 0..=MAX_PRICE_CENTS, line set differs from the sold
    ///   products, totals too large for the money type
    /// * `ShowcaseNotFound`
    /// * `ShowcaseNotFinalized` - returns not recorded yet
    /// * `NothingToSettle` - every piece came back
    /// * `DuplicateSale` - the showcase already has a sale
    pub async fn register_sale(&self, request: &RegisterSaleRequest) -> DbResult<SaleSummary> {
        request.validate()?;

        debug!(
            showcase_id = %request.showcase_id,
            mode = request.mode.as_str(),
            lines = request.lines.len(),
            "Registering sale"
        );

        with_deadline(self.timeout, "sales.register", async {
            let showcase_id = request.showcase_id.as_str();
            let state = load_state(&self.pool, showcase_id)
                .await?
                .ok_or_else(|| CoreError::ShowcaseNotFound(showcase_id.to_string()))?;

            if state.returns.is_empty() {
                return Err(CoreError::ShowcaseNotFinalized(showcase_id.to_string()).into());
            }
            if state.sale.is_some() {
                return Err(CoreError::DuplicateSale(showcase_id.to_string()).into());
            }

            let planned = plan_settlement(showcase_id, &state.reconciled(), request)?;
            let totals = SaleTotals::try_from_planned(&planned)?;

            let now = Utc::now();
            let sale = Sale {
                id: Uuid::new_v4().to_string(),
                showcase_id: Some(showcase_id.to_string()),
                distributor_id: state.showcase.distributor_id.clone(),
                description: request.normalized_description(),
                created_at: now,
            };
            let items: Vec<SoldProduct> = planned
                .iter()
                .map(|line| SoldProduct {
                    id: Uuid::new_v4().to_string(),
                    sale_id: sale.id.clone(),
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price.cents(),
                    commission_bps: line.rate.bps(),
                    created_at: now,
                })
                .collect();

            let mut tx = self.pool.begin().await?;

            let inserted = sqlx::query(
                r#"
                INSERT INTO sales (id, showcase_id, distributor_id, description, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&sale.id)
            .bind(&sale.showcase_id)
            .bind(&sale.distributor_id)
            .bind(&sale.description)
            .bind(sale.created_at)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(_) => {}
                Err(err) if is_unique_violation(&err) => {
                    tx.rollback().await?;
                    warn!(showcase_id = %showcase_id, "Concurrent sale lost the race");
                    return Err(CoreError::DuplicateSale(showcase_id.to_string()).into());
                }
                Err(err) => return Err(err.into()),
            }

            for item in &items {
                sqlx::query(
                    r#"
                    INSERT INTO sold_products (
                        id, sale_id, product_id, quantity,
                        unit_price_cents, commission_bps, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                )
                .bind(&item.id)
                .bind(&item.sale_id)
                .bind(&item.product_id)
                .bind(item.quantity)
                .bind(item.unit_price_cents)
                .bind(item.commission_bps)
                .bind(item.created_at)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;

            info!(
                sale_id = %sale.id,
                showcase_id = %showcase_id,
                total_cents = totals.total.cents(),
                commission_cents = totals.commission.cents(),
                "Sale registered"
            );

            Ok(SaleSummary::new(sale, items))
        })
        .await
    }

    /// Changes commission rates on a sale's items. Quantities and prices stay as they are.
    ///
    /// Either every update lands or none does.
    pub async fn update_sale(
        &self,
        sale_id: &str,
        updates: &[CommissionUpdate],
    ) -> DbResult<SaleSummary> {
        let rates = validate_commission_updates(updates)?;

        with_deadline(self.timeout, "sales.update", async {
            let sale = fetch_sale(&self.pool, sale_id)
                .await?
                .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

            let mut tx = self.pool.begin().await?;

            for (sold_product_id, rate) in &rates {
                let result = sqlx::query(
                    "UPDATE sold_products SET commission_bps = ?1 WHERE id = ?2 AND sale_id = ?3",
                )
                .bind(rate.bps())
                .bind(sold_product_id)
                .bind(sale_id)
                .execute(&mut *tx)
                .await?;

                if result.rows_affected() == 0 {
                    tx.rollback().await?;
                    return Err(CoreError::SoldProductNotFound {
                        sale_id: sale_id.to_string(),
                        sold_product_id: sold_product_id.clone(),
                    }
                    .into());
                }
            }

            tx.commit().await?;
            info!(sale_id = %sale_id, lines = rates.len(), "Sale commissions updated");

            let items = fetch_items(&self.pool, sale_id).await?;
            Ok(SaleSummary::new(sale, items))
        })
        .await
    }

    pub async fn get(&self, sale_id: &str) -> DbResult<Option<Sale>> {
        with_deadline(self.timeout, "sales.get", fetch_sale(&self.pool, sale_id)).await
    }

    /// The sale settling a showcase, if any.
    pub async fn get_by_showcase(&self, showcase_id: &str) -> DbResult<Option<Sale>> {
        with_deadline(self.timeout, "sales.get_by_showcase", async {
            let sale = sqlx::query_as::<_, Sale>(
                r#"
                SELECT id, showcase_id, distributor_id, description, created_at
                FROM sales
                WHERE showcase_id = ?1
                "#,
            )
            .bind(showcase_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(sale)
        })
        .await
    }

    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SoldProduct>> {
        with_deadline(self.timeout, "sales.items", async {
            if fetch_sale(&self.pool, sale_id).await?.is_none() {
                return Err(CoreError::SaleNotFound(sale_id.to_string()).into());
            }
            fetch_items(&self.pool, sale_id).await
        })
        .await
    }

    /// Sale, items and totals computed from the stored rows.
    pub async fn summary(&self, sale_id: &str) -> DbResult<SaleSummary> {
        with_deadline(self.timeout, "sales.summary", async {
            let sale = fetch_sale(&self.pool, sale_id)
                .await?
                .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
            let items = fetch_items(&self.pool, sale_id).await?;
            Ok(SaleSummary::new(sale, items))
        })
        .await
    }
}

async fn fetch_sale(pool: &SqlitePool, sale_id: &str) -> DbResult<Option<Sale>> {
    let sale = sqlx::query_as::<_, Sale>(
        r#"
        SELECT id, showcase_id, distributor_id, description, created_at
        FROM sales
        WHERE id = ?1
        "#,
    )
    .bind(sale_id)
    .fetch_optional(pool)
    .await?;
    Ok(sale)
}

async fn fetch_items(pool: &SqlitePool, sale_id: &str) -> DbResult<Vec<SoldProduct>> {
    let items = sqlx::query_as::<_, SoldProduct>(
        r#"
        SELECT id, sale_id, product_id, quantity, unit_price_cents, commission_bps, created_at
        FROM sold_products
        WHERE sale_id = ?1
        ORDER BY rowid
        "#,
    )
    .bind(sale_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

// =============================================================================
// Unit Tests
// =============================================================================
