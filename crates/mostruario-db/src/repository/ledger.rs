//! # Ledger Repository
//!
//! Append-only inventory movements and the stock sums derived from them.
//!
//! ## Outgoing Movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  INSERT INTO inventory_movements (...)                                  │
//! │  SELECT ...                                                             │
//! │  WHERE (SELECT COALESCE(SUM(quantity), 0)                               │
//! │         FROM inventory_movements WHERE product_id = ?) >= requested     │
//! │                                                                         │
//! │  rows_affected = 1  → written                                           │
//! │  rows_affected = 0  → InsufficientStock, nothing written                │
//! │                                                                         │
//! │  Check and write are one statement, so no other writer can slip a      │
//! │  movement between them.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::pool::with_deadline;
use crate::repository::product::fetch_product;
use mostruario_core::validation::{validate_movement_quantity, validate_reason};
use mostruario_core::{CoreError, InventoryMovement};

/// Ledger sum for one product.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StockLevel {
    pub product_id: String,
    pub code: String,
    pub stock: i64,
}

/// Repository for the inventory ledger.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl LedgerRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        LedgerRepository { pool, timeout }
    }

    /// Appends a direct stock entry (`quantity > 0`) or exit (`quantity < 0`).
    ///
    /// ## Errors
    /// * `Validation` - zero or out-of-range quantity, empty or long reason
    /// * `ProductNotFound` - unknown product
    /// * `InsufficientStock` - an exit larger than the current stock
    pub async fn record_movement(
        &self,
        product_id: &str,
        quantity: i64,
        reason: &str,
    ) -> DbResult<InventoryMovement> {
        validate_movement_quantity(quantity)?;
        let reason = validate_reason(reason)?;

        debug!(product_id = %product_id, quantity, "Recording movement");

        with_deadline(self.timeout, "ledger.record_movement", async {
            let product = fetch_product(&self.pool, product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

            let movement = InventoryMovement {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                quantity,
                reason,
                showcase_id: None,
                created_at: Utc::now(),
            };

            let mut conn = self.pool.acquire().await?;

            if quantity > 0 {
                insert_movement(&mut conn, &movement).await?;
            } else if !insert_outgoing_guarded(&mut conn, &movement).await? {
                let available = stock_of(&mut *conn, &product.id).await?;
                warn!(
                    code = %product.code,
                    available,
                    requested = -quantity,
                    "Stock exit rejected"
                );
                return Err(CoreError::InsufficientStock {
                    code: product.code.clone(),
                    available,
                    requested: -quantity,
                }
                .into());
            }

            info!(
                id = %movement.id,
                code = %product.code,
                quantity,
                "Movement recorded"
            );
            Ok(movement)
        })
        .await
    }

    /// All movements of a product in insertion order.
    pub async fn movements_for_product(&self, product_id: &str) -> DbResult<Vec<InventoryMovement>> {
        with_deadline(self.timeout, "ledger.movements_for_product", async {
            let movements = sqlx::query_as::<_, InventoryMovement>(
                r#"
                SELECT id, product_id, quantity, reason, showcase_id, created_at
                FROM inventory_movements
                WHERE product_id = ?1
                ORDER BY rowid
                "#,
            )
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(movements)
        })
        .await
    }

    /// Signed sum of the product's movements.
    pub async fn current_stock(&self, product_id: &str) -> DbResult<i64> {
        with_deadline(self.timeout, "ledger.current_stock", async {
            if fetch_product(&self.pool, product_id).await?.is_none() {
                return Err(CoreError::ProductNotFound(product_id.to_string()).into());
            }
            stock_of(&self.pool, product_id).await
        })
        .await
    }

    /// Stock that an outgoing movement may take. Same sum as [`Self::current_stock`].
    pub async fn available_stock(&self, product_id: &str) -> DbResult<i64> {
        self.current_stock(product_id).await
    }

    /// Ledger sum of every product, ordered by code.
    pub async fn stock_levels(&self) -> DbResult<Vec<StockLevel>> {
        with_deadline(self.timeout, "ledger.stock_levels", async {
            let levels = sqlx::query_as::<_, StockLevel>(
                r#"
                SELECT p.id AS product_id, p.code,
                       COALESCE(SUM(m.quantity), 0) AS stock
                FROM products p
                LEFT JOIN inventory_movements m ON m.product_id = p.id
                GROUP BY p.id, p.code
                ORDER BY p.code
                "#,
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(levels)
        })
        .await
    }
}

// =============================================================================
// Shared write helpers
// =============================================================================

/// Ledger sum for one product on any executor.
pub(crate) async fn stock_of<'e, E>(executor: E, product_id: &str) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let stock: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(quantity), 0) FROM inventory_movements WHERE product_id = ?1",
    )
    .bind(product_id.to_owned())
    .fetch_one(executor)
    .await?;
    Ok(stock)
}

/// Appends a movement unconditionally.
pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    movement: &InventoryMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO inventory_movements (id, product_id, quantity, reason, showcase_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(&movement.showcase_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Appends a negative movement only if the current sum covers it.
///
/// Returns `false` when the guard rejected the row.
pub(crate) async fn insert_outgoing_guarded(
    conn: &mut SqliteConnection,
    movement: &InventoryMovement,
) -> DbResult<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO inventory_movements (id, product_id, quantity, reason, showcase_id, created_at)
        SELECT ?1, ?2, ?3, ?4, ?5, ?6
        WHERE (SELECT COALESCE(SUM(quantity), 0)
               FROM inventory_movements
               WHERE product_id = ?2) >= ?7
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.product_id)
    .bind(movement.quantity)
    .bind(&movement.reason)
    .bind(&movement.showcase_id)
    .bind(movement.created_at)
    .bind(-movement.quantity)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::Database;
    use crate::repository::product::NewProduct;
    use mostruario_core::ValidationError;

    async fn setup() -> (Database, String) {
        let db = Database::in_memory().await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                code: "CO-0001".into(),
                name: "Colar de pérolas".into(),
                cost_price_cents: 8000,
                ..Default::default()
            })
            .await
            .unwrap();
        (db, product.id)
    }

    #[tokio::test]
    async fn test_stock_is_ledger_sum() {
        let (db, product_id) = setup().await;
        let ledger = db.ledger();

        ledger.record_movement(&product_id, 10, "Compra").await.unwrap();
        ledger.record_movement(&product_id, -4, "Venda balcão").await.unwrap();
        ledger.record_movement(&product_id, 2, "Ajuste").await.unwrap();

        assert_eq!(ledger.current_stock(&product_id).await.unwrap(), 8);
        assert_eq!(ledger.available_stock(&product_id).await.unwrap(), 8);

        let movements = ledger.movements_for_product(&product_id).await.unwrap();
        let quantities: Vec<i64> = movements.iter().map(|m| m.quantity).collect();
        assert_eq!(quantities, vec![10, -4, 2]);

        let levels = ledger.stock_levels().await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].stock, 8);
        assert_eq!(levels[0].code, "CO-0001");
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let (db, product_id) = setup().await;
        let err = db.ledger().record_movement(&product_id, 0, "Nada").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::MustBeNonZero { .. }))
        ));
        assert!(db.ledger().movements_for_product(&product_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let (db, _) = setup().await;
        let err = db.ledger().record_movement("missing", 5, "Compra").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        let err = db.ledger().current_stock("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_oversell_rejected_without_write() {
        let (db, product_id) = setup().await;
        let ledger = db.ledger();
        ledger.record_movement(&product_id, 3, "Compra").await.unwrap();

        let err = ledger.record_movement(&product_id, -5, "Venda").await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock { code, available, requested }) => {
                assert_eq!(code, "CO-0001");
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(ledger.current_stock(&product_id).await.unwrap(), 3);
        assert_eq!(ledger.movements_for_product(&product_id).await.unwrap().len(), 1);

        // Exactly the available amount is fine.
        ledger.record_movement(&product_id, -3, "Venda").await.unwrap();
        assert_eq!(ledger.current_stock(&product_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_movements_are_immutable() {
        let (db, product_id) = setup().await;
        let movement = db.ledger().record_movement(&product_id, 10, "Compra").await.unwrap();

        let err: DbError = sqlx::query("UPDATE inventory_movements SET quantity = 99 WHERE id = ?1")
            .bind(&movement.id)
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::ImmutableRow(_)));
        assert_eq!(db.ledger().current_stock(&product_id).await.unwrap(), 10);
    }
}
