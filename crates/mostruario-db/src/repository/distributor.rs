//! # Distributor Repository
//!
//! Distributor profiles and per-distributor resale price overrides.
//! Profile editing is out of scope; only what the ledger and the seed
//! binary need is here.

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::pool::with_deadline;
use crate::repository::product::fetch_product;
use mostruario_core::validation::{validate_name, validate_price_cents};
use mostruario_core::{CoreError, DistributorProfile, ProductPricing};

macro_rules! distributor_select {
    ($tail:literal) => {
        concat!(
            "SELECT id, name, email, phone, city, is_active, created_at ",
            "FROM distributor_profiles ",
            $tail
        )
    };
}

/// Fields for a new distributor.
#[derive(Debug, Clone, Default)]
pub struct NewDistributor {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

/// Repository for distributor database operations.
#[derive(Debug, Clone)]
pub struct DistributorRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl DistributorRepository {
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        DistributorRepository { pool, timeout }
    }

    /// Inserts an active distributor.
    pub async fn insert(&self, new: &NewDistributor) -> DbResult<DistributorProfile> {
        validate_name("name", &new.name)?;

        let profile = DistributorProfile {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            city: new.city.clone(),
            is_active: true,
            created_at: Utc::now(),
        };

        with_deadline(self.timeout, "distributors.insert", async {
            sqlx::query(
                r#"
                INSERT INTO distributor_profiles (id, name, email, phone, city, is_active, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&profile.id)
            .bind(&profile.name)
            .bind(&profile.email)
            .bind(&profile.phone)
            .bind(&profile.city)
            .bind(profile.is_active)
            .bind(profile.created_at)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await?;

        info!(id = %profile.id, name = %profile.name, "Distributor inserted");
        Ok(profile)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<DistributorProfile>> {
        with_deadline(self.timeout, "distributors.get_by_id", fetch_distributor(&self.pool, id)).await
    }

    /// Active distributors ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<DistributorProfile>> {
        with_deadline(self.timeout, "distributors.list_active", async {
            let profiles = sqlx::query_as::<_, DistributorProfile>(distributor_select!(
                "WHERE is_active = 1 ORDER BY name"
            ))
            .fetch_all(&self.pool)
            .await?;
            Ok(profiles)
        })
        .await
    }

    /// Activates or deactivates a distributor.
    ///
    /// Inactive distributors keep their showcases but cannot receive new ones.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        with_deadline(self.timeout, "distributors.set_active", async {
            let result = sqlx::query("UPDATE distributor_profiles SET is_active = ?2 WHERE id = ?1")
                .bind(id)
                .bind(active)
                .execute(&self.pool)
                .await?;

            if result.rows_affected() == 0 {
                return Err(CoreError::DistributorNotFound(id.to_string()).into());
            }
            Ok(())
        })
        .await?;

        info!(id = %id, active, "Distributor active flag changed");
        Ok(())
    }

    /// Sets (or replaces) the distributor's resale price for a product.
    pub async fn set_resale_price(
        &self,
        distributor_id: &str,
        product_id: &str,
        resale_price_cents: i64,
    ) -> DbResult<ProductPricing> {
        validate_price_cents("resale_price", resale_price_cents)?;

        with_deadline(self.timeout, "distributors.set_resale_price", async {
            if fetch_distributor(&self.pool, distributor_id).await?.is_none() {
                return Err(CoreError::DistributorNotFound(distributor_id.to_string()).into());
            }
            if fetch_product(&self.pool, product_id).await?.is_none() {
                return Err(CoreError::ProductNotFound(product_id.to_string()).into());
            }

            let pricing = ProductPricing {
                distributor_id: distributor_id.to_string(),
                product_id: product_id.to_string(),
                resale_price_cents,
                updated_at: Utc::now(),
            };

            sqlx::query(
                r#"
                INSERT INTO product_pricing (distributor_id, product_id, resale_price_cents, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT (distributor_id, product_id)
                DO UPDATE SET resale_price_cents = excluded.resale_price_cents,
                              updated_at = excluded.updated_at
                "#,
            )
            .bind(&pricing.distributor_id)
            .bind(&pricing.product_id)
            .bind(pricing.resale_price_cents)
            .bind(pricing.updated_at)
            .execute(&self.pool)
            .await?;

            debug!(
                distributor_id = %distributor_id,
                product_id = %product_id,
                resale_price_cents,
                "Resale price set"
            );
            Ok(pricing)
        })
        .await
    }

    pub async fn get_resale_price(
        &self,
        distributor_id: &str,
        product_id: &str,
    ) -> DbResult<Option<ProductPricing>> {
        with_deadline(
            self.timeout,
            "distributors.get_resale_price",
            fetch_resale_price(&self.pool, distributor_id, product_id),
        )
        .await
    }
}

pub(crate) async fn fetch_distributor<'e, E>(executor: E, id: &str) -> DbResult<Option<DistributorProfile>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let profile = sqlx::query_as::<_, DistributorProfile>(distributor_select!("WHERE id = ?1"))
        .bind(id.to_owned())
        .fetch_optional(executor)
        .await?;
    Ok(profile)
}

pub(crate) async fn fetch_resale_price<'e, E>(
    executor: E,
    distributor_id: &str,
    product_id: &str,
) -> DbResult<Option<ProductPricing>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let pricing = sqlx::query_as::<_, ProductPricing>(
        r#"
        SELECT distributor_id, product_id, resale_price_cents, updated_at
        FROM product_pricing
        WHERE distributor_id = ?1 AND product_id = ?2
        "#,
    )
    .bind(distributor_id.to_owned())
    .bind(product_id.to_owned())
    .fetch_optional(executor)
    .await?;
    Ok(pricing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::Database;
    use crate::repository::product::NewProduct;

    fn ana() -> NewDistributor {
        NewDistributor {
            name: "Ana Souza".into(),
            city: Some("Limeira".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_insert_and_deactivate() {
        let db = Database::in_memory().await.unwrap();
        let repo = db.distributors();

        let profile = repo.insert(&ana()).await.unwrap();
        assert!(profile.is_active);
        assert_eq!(repo.list_active().await.unwrap().len(), 1);

        repo.set_active(&profile.id, false).await.unwrap();
        assert!(repo.list_active().await.unwrap().is_empty());

        let stored = repo.get_by_id(&profile.id).await.unwrap().unwrap();
        assert!(!stored.is_active);

        let err = repo.set_active("missing", true).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::DistributorNotFound(_))));
    }

    #[tokio::test]
    async fn test_resale_price_upsert() {
        let db = Database::in_memory().await.unwrap();
        let profile = db.distributors().insert(&ana()).await.unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                code: "BR-0001".into(),
                name: "Brinco".into(),
                cost_price_cents: 1500,
                ..Default::default()
            })
            .await
            .unwrap();

        let repo = db.distributors();
        assert!(repo.get_resale_price(&profile.id, &product.id).await.unwrap().is_none());

        repo.set_resale_price(&profile.id, &product.id, 4500).await.unwrap();
        repo.set_resale_price(&profile.id, &product.id, 4900).await.unwrap();

        let pricing = repo.get_resale_price(&profile.id, &product.id).await.unwrap().unwrap();
        assert_eq!(pricing.resale_price_cents, 4900);

        assert!(repo.set_resale_price(&profile.id, &product.id, -1).await.is_err());
        assert!(matches!(
            repo.set_resale_price(&profile.id, "missing", 100).await,
            Err(DbError::Domain(CoreError::ProductNotFound(_)))
        ));
    }
}
