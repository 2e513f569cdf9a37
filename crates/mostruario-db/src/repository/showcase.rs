//! # Showcase Repository
//!
//! Creation, finishing and reads of consigned showcases.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create()                finish()                 register_sale()      │
//! │      │                       │                           │              │
//! │      ▼                       ▼                           ▼              │
//! │  ┌────────┐  returns   ┌───────────┐   sale row    ┌─────────┐          │
//! │  │ Active │ ─────────► │ Finalized │ ────────────► │ Settled │          │
//! │  └────────┘            └───────────┘               └─────────┘          │
//! │                              │                                          │
//! │                              │ Σ sold = 0                               │
//! │                              ▼                                          │
//! │                     ┌──────────────────┐                               │
//! │                     │ FinalizedNoSale  │                               │
//! │                     └──────────────────┘                               │
//! │                                                                         │
//! │  No status column: derive_status() runs over the rows every read.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Create Transaction
//! ```text
//! BEGIN
//!   INSERT showcases ... code computed in the same statement   (write lock)
//!   INSERT guarded movement, line 1   ── 0 rows? ──► ROLLBACK, InsufficientStock
//!   INSERT guarded movement, line N
//! COMMIT
//! ```
//! The showcase row never survives a rejected line.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::LedgerSettings;
use crate::error::{is_unique_violation, DbResult};
use crate::pool::with_deadline;
use crate::repository::distributor::fetch_distributor;
use crate::repository::ledger::{insert_movement, insert_outgoing_guarded, stock_of};
use crate::repository::product::fetch_product;
use mostruario_core::holdings::history_totals;
use mostruario_core::ledger::{
    check_admission, sent_by_product, SHOWCASE_RESTOCK_REASON, SHOWCASE_SHIPMENT_REASON,
};
use mostruario_core::showcase::{
    derive_status, lines_from_sent, reconcile, validate_returns, CreateShowcaseRequest,
    ReconciledLine, ReturnLineInput, ShowcaseFilter, ShowcaseLine, ShowcaseSummary, ShowcaseTotals,
};
use mostruario_core::{
    CoreError, InventoryMovement, Product, Sale, Showcase, ShowcaseReturn, ShowcaseStatus,
    SoldProduct,
};

/// Repository for showcase database operations.
#[derive(Debug, Clone)]
pub struct ShowcaseRepository {
    pool: SqlitePool,
    timeout: Duration,
    settings: LedgerSettings,
}

impl ShowcaseRepository {
    pub fn new(pool: SqlitePool, timeout: Duration, settings: LedgerSettings) -> Self {
        ShowcaseRepository {
            pool,
            timeout,
            settings,
        }
    }

    /// Ships pieces to a distributor.
    ///
    /// Every line is admitted against the ledger or none is: one rejected
    /// line rolls back the showcase row and any movement already written.
    ///
    /// ## Errors
    /// * `Validation` - empty or oversized line set, duplicate product, bad quantity
    /// * `DistributorNotFound` / `DistributorInactive`
    /// * `ProductNotFound`
    /// * `InsufficientStock` - some line asks for more than the ledger holds
    pub async fn create(&self, request: &CreateShowcaseRequest) -> DbResult<Showcase> {
        request.validate()?;

        debug!(
            distributor_id = %request.distributor_id,
            lines = request.lines.len(),
            "Creating showcase"
        );

        with_deadline(self.timeout, "showcases.create", async {
            let distributor = fetch_distributor(&self.pool, &request.distributor_id)
                .await?
                .ok_or_else(|| CoreError::DistributorNotFound(request.distributor_id.clone()))?;
            if !distributor.is_active {
                return Err(CoreError::DistributorInactive(distributor.id).into());
            }

            let mut products: Vec<Product> = Vec::with_capacity(request.lines.len());
            for line in &request.lines {
                let product = fetch_product(&self.pool, &line.product_id)
                    .await?
                    .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
                let available = stock_of(&self.pool, &product.id).await?;
                check_admission(&product.code, available, line.quantity)?;
                products.push(product);
            }

            let now = Utc::now();
            let id = Uuid::new_v4().to_string();
            let code_prefix = format!(
                "{}-{}-",
                self.settings.showcase_code_prefix,
                now.format("%Y%m%d")
            );

            let mut tx = self.pool.begin().await?;

            let code: String = sqlx::query_scalar(
                r#"
                INSERT INTO showcases (id, code, distributor_id, created_at)
                SELECT ?1, ?2 || printf('%04d', COUNT(*) + 1), ?3, ?4
                FROM showcases
                WHERE substr(code, 1, length(?2)) = ?2
                RETURNING code
                "#,
            )
            .bind(&id)
            .bind(&code_prefix)
            .bind(&distributor.id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            for (line, product) in request.lines.iter().zip(&products) {
                let movement = InventoryMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: product.id.clone(),
                    quantity: -line.quantity,
                    reason: SHOWCASE_SHIPMENT_REASON.to_string(),
                    showcase_id: Some(id.clone()),
                    created_at: now,
                };

                if !insert_outgoing_guarded(&mut tx, &movement).await? {
                    let available = stock_of(&mut *tx, &product.id).await?;
                    tx.rollback().await?;
                    warn!(
                        code = %product.code,
                        available,
                        requested = line.quantity,
                        "Showcase rejected, rolled back"
                    );
                    return Err(CoreError::InsufficientStock {
                        code: product.code.clone(),
                        available,
                        requested: line.quantity,
                    }
                    .into());
                }
            }

            tx.commit().await?;

            info!(id = %id, code = %code, distributor_id = %distributor.id, "Showcase created");

            Ok(Showcase {
                id,
                code,
                distributor_id: distributor.id,
                created_at: now,
            })
        })
        .await
    }

    /// Records the returned quantities and closes the showcase.
    ///
    /// Returns the status the showcase lands in: `Finalized` when something
    /// was sold, `FinalizedNoSale` when every piece came back.
    ///
    /// ## Errors
    /// * `ShowcaseNotFound`
    /// * `ShowcaseAlreadyFinalized` - returns exist, including when another
    ///   writer finished it first
    /// * `Validation` - returns do not match the shipped lines
    pub async fn finish(
        &self,
        showcase_id: &str,
        returns: &[ReturnLineInput],
    ) -> DbResult<ShowcaseStatus> {
        debug!(showcase_id = %showcase_id, lines = returns.len(), "Finishing showcase");

        with_deadline(self.timeout, "showcases.finish", async {
            let state = load_state(&self.pool, showcase_id)
                .await?
                .ok_or_else(|| CoreError::ShowcaseNotFound(showcase_id.to_string()))?;

            if !state.returns.is_empty() {
                return Err(CoreError::ShowcaseAlreadyFinalized(showcase_id.to_string()).into());
            }
            validate_returns(&state.lines, returns)?;

            let now = Utc::now();
            let rows: Vec<ShowcaseReturn> = returns
                .iter()
                .map(|r| ShowcaseReturn {
                    id: Uuid::new_v4().to_string(),
                    showcase_id: showcase_id.to_string(),
                    product_id: r.product_id.clone(),
                    returned_quantity: r.returned_quantity,
                    created_at: now,
                })
                .collect();

            let mut tx = self.pool.begin().await?;

            for row in &rows {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO showcase_returns (id, showcase_id, product_id, returned_quantity, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(&row.id)
                .bind(&row.showcase_id)
                .bind(&row.product_id)
                .bind(row.returned_quantity)
                .bind(row.created_at)
                .execute(&mut *tx)
                .await;

                match inserted {
                    Ok(_) => {}
                    Err(err) if is_unique_violation(&err) => {
                        tx.rollback().await?;
                        warn!(showcase_id = %showcase_id, "Concurrent finish lost the race");
                        return Err(
                            CoreError::ShowcaseAlreadyFinalized(showcase_id.to_string()).into()
                        );
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            if self.settings.restock_returns_on_finish {
                for row in rows.iter().filter(|r| r.returned_quantity > 0) {
                    let movement = InventoryMovement {
                        id: Uuid::new_v4().to_string(),
                        product_id: row.product_id.clone(),
                        quantity: row.returned_quantity,
                        reason: SHOWCASE_RESTOCK_REASON.to_string(),
                        showcase_id: Some(showcase_id.to_string()),
                        created_at: now,
                    };
                    insert_movement(&mut tx, &movement).await?;
                }
            }

            tx.commit().await?;

            let status = derive_status(&state.lines, &rows, false);
            info!(
                showcase_id = %showcase_id,
                code = %state.showcase.code,
                status = %status,
                "Showcase finished"
            );
            Ok(status)
        })
        .await
    }

    /// Gets a showcase by ID.
    pub async fn get(&self, showcase_id: &str) -> DbResult<Option<Showcase>> {
        with_deadline(self.timeout, "showcases.get", async {
            let showcase = sqlx::query_as::<_, Showcase>(
                "SELECT id, code, distributor_id, created_at FROM showcases WHERE id = ?1",
            )
            .bind(showcase_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(showcase)
        })
        .await
    }

    /// Shipped quantity per product, recomputed from the showcase's movements.
    pub async fn lines(&self, showcase_id: &str) -> DbResult<Vec<ShowcaseLine>> {
        Ok(self.state("showcases.lines", showcase_id).await?.lines)
    }

    pub async fn returns(&self, showcase_id: &str) -> DbResult<Vec<ShowcaseReturn>> {
        Ok(self.state("showcases.returns", showcase_id).await?.returns)
    }

    pub async fn status(&self, showcase_id: &str) -> DbResult<ShowcaseStatus> {
        Ok(self.state("showcases.status", showcase_id).await?.status())
    }

    /// Sent, returned and sold per product for a finished showcase.
    pub async fn reconciliation(&self, showcase_id: &str) -> DbResult<Vec<ReconciledLine>> {
        let state = self.state("showcases.reconciliation", showcase_id).await?;
        if state.returns.is_empty() {
            return Err(CoreError::ShowcaseNotFinalized(showcase_id.to_string()).into());
        }
        Ok(state.reconciled())
    }

    /// Lists showcases with derived status and totals, newest first.
    pub async fn list(&self, filter: &ShowcaseFilter) -> DbResult<Vec<ShowcaseSummary>> {
        with_deadline(self.timeout, "showcases.list", async {
            let mut tx = self.pool.begin().await?;
            let states = load_states(&mut tx, filter.distributor_id.as_deref(), None).await?;

            let names: HashMap<String, String> =
                sqlx::query_as::<_, (String, String)>("SELECT id, name FROM distributor_profiles")
                    .fetch_all(&mut *tx)
                    .await?
                    .into_iter()
                    .collect();
            tx.commit().await?;

            let summaries: Vec<ShowcaseSummary> = states
                .into_iter()
                .filter_map(|state| {
                    let status = state.status();
                    if !filter.matches(&state.showcase, status) {
                        return None;
                    }
                    let totals = state.totals();
                    let distributor_name = names
                        .get(&state.showcase.distributor_id)
                        .cloned()
                        .unwrap_or_default();
                    Some(ShowcaseSummary {
                        showcase: state.showcase,
                        distributor_name,
                        status,
                        totals,
                    })
                })
                .collect();

            debug!(count = summaries.len(), "Listed showcases");
            Ok(summaries)
        })
        .await
    }

    async fn state(&self, operation: &'static str, showcase_id: &str) -> DbResult<ShowcaseState> {
        with_deadline(self.timeout, operation, async {
            load_state(&self.pool, showcase_id)
                .await?
                .ok_or_else(|| CoreError::ShowcaseNotFound(showcase_id.to_string()).into())
        })
        .await
    }
}

// =============================================================================
// Showcase state
// =============================================================================

/// Everything the derived views of one showcase are computed from.
#[derive(Debug, Clone)]
pub(crate) struct ShowcaseState {
    pub showcase: Showcase,
    pub lines: Vec<ShowcaseLine>,
    pub returns: Vec<ShowcaseReturn>,
    pub sale: Option<Sale>,
    pub sold: Vec<SoldProduct>,
}

impl ShowcaseState {
    pub fn status(&self) -> ShowcaseStatus {
        derive_status(&self.lines, &self.returns, self.sale.is_some())
    }

    pub fn reconciled(&self) -> Vec<ReconciledLine> {
        reconcile(&self.lines, &self.returns)
    }

    /// When the returns were recorded.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.returns.iter().map(|r| r.created_at).min()
    }

    pub fn totals(&self) -> ShowcaseTotals {
        history_totals(&self.reconciled(), &self.sold)
    }
}

/// One showcase read inside its own transaction.
pub(crate) async fn load_state(pool: &SqlitePool, showcase_id: &str) -> DbResult<Option<ShowcaseState>> {
    let mut tx = pool.begin().await?;
    let state = load_states(&mut tx, None, Some(showcase_id)).await?.pop();
    tx.commit().await?;
    Ok(state)
}

/// Loads showcases with their movements, returns and sale in five queries.
///
/// Run it on a transaction: the five reads must share one snapshot or a
/// finish and sale landing between them yields a sale without returns.
/// `None` filters match everything. Ordered newest first.
pub(crate) async fn load_states(
    conn: &mut SqliteConnection,
    distributor_id: Option<&str>,
    showcase_id: Option<&str>,
) -> DbResult<Vec<ShowcaseState>> {
    let showcases: Vec<Showcase> = sqlx::query_as(
        r#"
        SELECT s.id, s.code, s.distributor_id, s.created_at
        FROM showcases s
        WHERE (?1 IS NULL OR s.distributor_id = ?1)
          AND (?2 IS NULL OR s.id = ?2)
        ORDER BY s.created_at DESC, s.rowid DESC
        "#,
    )
    .bind(distributor_id)
    .bind(showcase_id)
    .fetch_all(&mut *conn)
    .await?;

    if showcases.is_empty() {
        return Ok(Vec::new());
    }

    let movements: Vec<InventoryMovement> = sqlx::query_as(
        r#"
        SELECT m.id, m.product_id, m.quantity, m.reason, m.showcase_id, m.created_at
        FROM inventory_movements m
        JOIN showcases s ON s.id = m.showcase_id
        WHERE (?1 IS NULL OR s.distributor_id = ?1)
          AND (?2 IS NULL OR s.id = ?2)
        ORDER BY m.rowid
        "#,
    )
    .bind(distributor_id)
    .bind(showcase_id)
    .fetch_all(&mut *conn)
    .await?;

    let returns: Vec<ShowcaseReturn> = sqlx::query_as(
        r#"
        SELECT r.id, r.showcase_id, r.product_id, r.returned_quantity, r.created_at
        FROM showcase_returns r
        JOIN showcases s ON s.id = r.showcase_id
        WHERE (?1 IS NULL OR s.distributor_id = ?1)
          AND (?2 IS NULL OR s.id = ?2)
        ORDER BY r.rowid
        "#,
    )
    .bind(distributor_id)
    .bind(showcase_id)
    .fetch_all(&mut *conn)
    .await?;

    let sales: Vec<Sale> = sqlx::query_as(
        r#"
        SELECT sa.id, sa.showcase_id, sa.distributor_id, sa.description, sa.created_at
        FROM sales sa
        JOIN showcases s ON s.id = sa.showcase_id
        WHERE (?1 IS NULL OR s.distributor_id = ?1)
          AND (?2 IS NULL OR s.id = ?2)
        "#,
    )
    .bind(distributor_id)
    .bind(showcase_id)
    .fetch_all(&mut *conn)
    .await?;

    let sold: Vec<SoldProduct> = sqlx::query_as(
        r#"
        SELECT sp.id, sp.sale_id, sp.product_id, sp.quantity,
               sp.unit_price_cents, sp.commission_bps, sp.created_at
        FROM sold_products sp
        JOIN sales sa ON sa.id = sp.sale_id
        JOIN showcases s ON s.id = sa.showcase_id
        WHERE (?1 IS NULL OR s.distributor_id = ?1)
          AND (?2 IS NULL OR s.id = ?2)
        ORDER BY sp.rowid
        "#,
    )
    .bind(distributor_id)
    .bind(showcase_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut movements_by_showcase: HashMap<String, Vec<InventoryMovement>> = HashMap::new();
    for movement in movements {
        if let Some(ref id) = movement.showcase_id {
            movements_by_showcase.entry(id.clone()).or_default().push(movement);
        }
    }

    let mut returns_by_showcase: HashMap<String, Vec<ShowcaseReturn>> = HashMap::new();
    for ret in returns {
        returns_by_showcase.entry(ret.showcase_id.clone()).or_default().push(ret);
    }

    let mut sold_by_sale: HashMap<String, Vec<SoldProduct>> = HashMap::new();
    for item in sold {
        sold_by_sale.entry(item.sale_id.clone()).or_default().push(item);
    }

    let mut sale_by_showcase: HashMap<String, Sale> = HashMap::new();
    for sale in sales {
        if let Some(ref id) = sale.showcase_id {
            sale_by_showcase.insert(id.clone(), sale);
        }
    }

    let states = showcases
        .into_iter()
        .map(|showcase| {
            let movements = movements_by_showcase.remove(&showcase.id).unwrap_or_default();
            let sale = sale_by_showcase.remove(&showcase.id);
            let sold = sale
                .as_ref()
                .and_then(|s| sold_by_sale.remove(&s.id))
                .unwrap_or_default();
            ShowcaseState {
                lines: lines_from_sent(sent_by_product(&movements)),
                returns: returns_by_showcase.remove(&showcase.id).unwrap_or_default(),
                sale,
                sold,
                showcase,
            }
        })
        .collect();

    Ok(states)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::distributor::NewDistributor;
    use crate::repository::product::NewProduct;
    use mostruario_core::settlement::{CommissionMode, RegisterSaleRequest, SaleLineInput};
    use mostruario_core::showcase::ShowcaseLineInput;

    struct Fixture {
        db: Database,
        distributor_id: String,
        ring: String,
        chain: String,
    }

    async fn fixture() -> Fixture {
        fixture_on(Database::in_memory().await.unwrap()).await
    }

    /// Beatriz plus ten rings and ten chains in stock.
    async fn fixture_on(db: Database) -> Fixture {
        let distributor = db
            .distributors()
            .insert(&NewDistributor {
                name: "Beatriz Lima".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for (code, name) in [("AN-0001", "Anel"), ("CO-0001", "Corrente")] {
            let product = db
                .products()
                .insert(&NewProduct {
                    code: code.into(),
                    name: name.into(),
                    cost_price_cents: 5000,
                    ..Default::default()
                })
                .await
                .unwrap();
            db.ledger().record_movement(&product.id, 10, "Compra").await.unwrap();
            ids.push(product.id);
        }

        Fixture {
            db,
            distributor_id: distributor.id,
            chain: ids.pop().unwrap(),
            ring: ids.pop().unwrap(),
        }
    }

    fn request(f: &Fixture, lines: &[(&str, i64)]) -> CreateShowcaseRequest {
        CreateShowcaseRequest {
            distributor_id: f.distributor_id.clone(),
            lines: lines
                .iter()
                .map(|(product_id, quantity)| ShowcaseLineInput {
                    product_id: product_id.to_string(),
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    fn ret(product_id: &str, returned: i64) -> ReturnLineInput {
        ReturnLineInput {
            product_id: product_id.to_string(),
            returned_quantity: returned,
        }
    }

    #[tokio::test]
    async fn test_create_takes_stock_and_numbers_codes() {
        let f = fixture().await;
        let repo = f.db.showcases();

        let first = repo.create(&request(&f, &[(&f.ring, 4)])).await.unwrap();
        let second = repo.create(&request(&f, &[(&f.chain, 1)])).await.unwrap();

        assert!(first.code.starts_with("MST-"));
        assert!(first.code.ends_with("-0001"));
        assert!(second.code.ends_with("-0002"));

        assert_eq!(f.db.ledger().current_stock(&f.ring).await.unwrap(), 6);
        assert_eq!(repo.status(&first.id).await.unwrap(), ShowcaseStatus::Active);

        let lines = repo.lines(&first.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].sent_quantity, 4);
    }

    #[tokio::test]
    async fn test_rejected_line_rolls_back_everything() {
        let f = fixture().await;
        let repo = f.db.showcases();

        let err = repo
            .create(&request(&f, &[(&f.ring, 2), (&f.chain, 11)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 10, requested: 11, .. })
        ));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM showcases")
            .fetch_one(f.db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(f.db.ledger().current_stock(&f.ring).await.unwrap(), 10);
        assert_eq!(f.db.ledger().current_stock(&f.chain).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_create_rejects_inactive_distributor() {
        let f = fixture().await;
        f.db.distributors().set_active(&f.distributor_id, false).await.unwrap();

        let err = f.db.showcases().create(&request(&f, &[(&f.ring, 1)])).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DistributorInactive(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_lines() {
        let f = fixture().await;
        let repo = f.db.showcases();

        assert!(matches!(
            repo.create(&request(&f, &[])).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(matches!(
            repo.create(&request(&f, &[(&f.ring, 1), (&f.ring, 2)])).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(matches!(
            repo.create(&request(&f, &[(&f.ring, 0)])).await,
            Err(DbError::Domain(CoreError::Validation(_)))
        ));
        assert!(matches!(
            repo.create(&request(&f, &[("missing", 1)])).await,
            Err(DbError::Domain(CoreError::ProductNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_finish_statuses() {
        let f = fixture().await;
        let repo = f.db.showcases();

        let sold_some = repo.create(&request(&f, &[(&f.ring, 4)])).await.unwrap();
        let status = repo.finish(&sold_some.id, &[ret(&f.ring, 1)]).await.unwrap();
        assert_eq!(status, ShowcaseStatus::Finalized);

        let reconciled = repo.reconciliation(&sold_some.id).await.unwrap();
        assert_eq!(reconciled[0].sent, 4);
        assert_eq!(reconciled[0].returned, 1);
        assert_eq!(reconciled[0].sold, 3);

        let all_back = repo.create(&request(&f, &[(&f.chain, 2)])).await.unwrap();
        let status = repo.finish(&all_back.id, &[ret(&f.chain, 2)]).await.unwrap();
        assert_eq!(status, ShowcaseStatus::FinalizedNoSale);
        assert_eq!(repo.status(&all_back.id).await.unwrap(), ShowcaseStatus::FinalizedNoSale);

        // Without restocking, returns do not touch the ledger.
        assert_eq!(f.db.ledger().current_stock(&f.chain).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn test_finish_twice_keeps_first_returns() {
        let f = fixture().await;
        let repo = f.db.showcases();

        let showcase = repo.create(&request(&f, &[(&f.ring, 4)])).await.unwrap();
        repo.finish(&showcase.id, &[ret(&f.ring, 1)]).await.unwrap();
        let before = repo.returns(&showcase.id).await.unwrap();

        let err = repo.finish(&showcase.id, &[ret(&f.ring, 3)]).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ShowcaseAlreadyFinalized(_))));

        let after = repo.returns(&showcase.id).await.unwrap();
        assert_eq!(before, after);
        assert_eq!(after[0].returned_quantity, 1);
    }

    #[tokio::test]
    async fn test_finish_validates_return_set() {
        let f = fixture().await;
        let repo = f.db.showcases();
        let showcase = repo
            .create(&request(&f, &[(&f.ring, 4), (&f.chain, 2)]))
            .await
            .unwrap();

        // Missing line.
        assert!(repo.finish(&showcase.id, &[ret(&f.ring, 0)]).await.is_err());
        // More back than was sent.
        assert!(repo
            .finish(&showcase.id, &[ret(&f.ring, 5), ret(&f.chain, 0)])
            .await
            .is_err());
        // Unknown showcase.
        assert!(matches!(
            repo.finish("missing", &[]).await,
            Err(DbError::Domain(CoreError::ShowcaseNotFound(_)))
        ));

        assert_eq!(repo.status(&showcase.id).await.unwrap(), ShowcaseStatus::Active);
        assert!(matches!(
            repo.reconciliation(&showcase.id).await,
            Err(DbError::Domain(CoreError::ShowcaseNotFinalized(_)))
        ));
    }

    #[tokio::test]
    async fn test_restock_on_finish() {
        let f = fixture().await;
        let settings = LedgerSettings {
            restock_returns_on_finish: true,
            ..Default::default()
        };
        let repo = ShowcaseRepository::new(f.db.pool().clone(), f.db.operation_timeout(), settings);

        let showcase = repo.create(&request(&f, &[(&f.ring, 4)])).await.unwrap();
        repo.finish(&showcase.id, &[ret(&f.ring, 1)]).await.unwrap();

        assert_eq!(f.db.ledger().current_stock(&f.ring).await.unwrap(), 7);

        // Sent quantity ignores the restock movement.
        let lines = repo.lines(&showcase.id).await.unwrap();
        assert_eq!(lines[0].sent_quantity, 4);
        assert_eq!(repo.reconciliation(&showcase.id).await.unwrap()[0].sold, 3);
    }

    #[tokio::test]
    async fn test_list_filters_and_totals() {
        let f = fixture().await;
        let repo = f.db.showcases();

        let active = repo.create(&request(&f, &[(&f.ring, 2)])).await.unwrap();
        let finished = repo.create(&request(&f, &[(&f.chain, 3)])).await.unwrap();
        repo.finish(&finished.id, &[ret(&f.chain, 1)]).await.unwrap();

        let all = repo.list(&ShowcaseFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].distributor_name, "Beatriz Lima");

        let only_active = repo
            .list(&ShowcaseFilter {
                status: Some(ShowcaseStatus::Active),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(only_active.len(), 1);
        assert_eq!(only_active[0].showcase.id, active.id);
        assert_eq!(only_active[0].totals.units_sent, 2);

        let finalized = repo
            .list(&ShowcaseFilter {
                status: Some(ShowcaseStatus::Finalized),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].totals.units_sold, 2);
        assert_eq!(finalized[0].totals.sale_total_cents, None);

        let other = repo
            .list(&ShowcaseFilter {
                distributor_id: Some("someone-else".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_state_reads_share_one_snapshot() {
        let path = std::env::temp_dir().join(format!("mostruario-snapshot-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(4)).await.unwrap();
        let f = fixture_on(db).await;
        let showcase = f.db.showcases().create(&request(&f, &[(&f.ring, 4)])).await.unwrap();

        let mut reader = f.db.pool().begin().await.unwrap();
        let before = load_states(&mut reader, None, Some(&showcase.id)).await.unwrap();
        assert_eq!(before[0].status(), ShowcaseStatus::Active);

        // finish and settle on other connections while the read is open
        f.db.showcases().finish(&showcase.id, &[ret(&f.ring, 1)]).await.unwrap();
        f.db.sales()
            .register_sale(&RegisterSaleRequest {
                showcase_id: showcase.id.clone(),
                lines: vec![SaleLineInput {
                    product_id: f.ring.clone(),
                    unit_price_cents: 10000,
                    commission_bps: None,
                }],
                mode: CommissionMode::Global { commission_bps: 1000 },
                description: None,
            })
            .await
            .unwrap();

        let during = load_states(&mut reader, None, Some(&showcase.id)).await.unwrap();
        assert_eq!(during[0].status(), ShowcaseStatus::Active);
        assert!(during[0].returns.is_empty());
        assert!(during[0].sale.is_none());
        assert!(during[0].sold.is_empty());
        assert_eq!(during[0].totals().sale_total_cents, None);
        reader.commit().await.unwrap();

        let after = load_state(f.db.pool(), &showcase.id).await.unwrap().unwrap();
        assert_eq!(after.status(), ShowcaseStatus::Settled);
        assert_eq!(after.returns.len(), 1);
        assert_eq!(after.totals().sale_total_cents, Some(30000));

        f.db.close().await;
        let _ = std::fs::remove_file(&path);
        for suffix in ["-wal", "-shm"] {
            let mut side = path.clone().into_os_string();
            side.push(suffix);
            let _ = std::fs::remove_file(std::path::PathBuf::from(side));
        }
    }
}
