//! # Product Repository
//!
//! Catalog reads used by the ledger, plus the minimal inserts the seed
//! binary and tests need. Catalog editing lives outside this crate.
//!
//! ## Stock In The Product List
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products ──LEFT JOIN── categories                                      │
//! │     │                                                                   │
//! │     └── (SELECT COALESCE(SUM(quantity), 0)                              │
//! │          FROM inventory_movements WHERE product_id = p.id)              │
//! │                          = current_stock                                │
//! │                                                                         │
//! │  There is no stock column to read: the list always shows the ledger.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::pool::with_deadline;
use mostruario_core::validation::{validate_name, validate_price_cents, validate_product_code};
use mostruario_core::{
    Category, CoreError, Product, ProductPhoto, ProductWithStock, ValidationError,
};

/// `SELECT <product columns> FROM products <tail>` as a `&'static str`.
macro_rules! product_select {
    ($tail:literal) => {
        concat!(
            "SELECT id, code, name, description, category_id, ",
            "cost_price_cents, selling_price_cents, is_active, ",
            "created_at, updated_at FROM products ",
            $tail
        )
    };
}

/// Fields for a new catalog entry.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub cost_price_cents: i64,
    pub selling_price_cents: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct ProductStockRow {
    #[sqlx(flatten)]
    product: Product,
    category_name: Option<String>,
    current_stock: i64,
}

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    timeout: Duration,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, timeout: Duration) -> Self {
        ProductRepository { pool, timeout }
    }

    /// Inserts a category.
    pub async fn insert_category(&self, name: &str) -> DbResult<Category> {
        validate_name("category name", name)?;

        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        with_deadline(self.timeout, "products.insert_category", async {
            sqlx::query("INSERT INTO categories (id, name, created_at) VALUES (?1, ?2, ?3)")
                .bind(&category.id)
                .bind(&category.name)
                .bind(category.created_at)
                .execute(&self.pool)
                .await?;
            Ok(())
        })
        .await?;

        debug!(id = %category.id, name = %category.name, "Category inserted");
        Ok(category)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id and timestamps
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_code(&new.code)?;
        validate_name("name", &new.name)?;
        validate_price_cents("cost_price", new.cost_price_cents)?;
        if let Some(selling) = new.selling_price_cents {
            validate_price_cents("selling_price", selling)?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: new.code.trim().to_string(),
            name: new.name.trim().to_string(),
            description: new.description.clone(),
            category_id: new.category_id.clone(),
            cost_price_cents: new.cost_price_cents,
            selling_price_cents: new.selling_price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(code = %product.code, "Inserting product");

        with_deadline(self.timeout, "products.insert", async {
            let result = sqlx::query(
                r#"
                INSERT INTO products (
                    id, code, name, description, category_id,
                    cost_price_cents, selling_price_cents, is_active,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
            )
            .bind(&product.id)
            .bind(&product.code)
            .bind(&product.name)
            .bind(&product.description)
            .bind(&product.category_id)
            .bind(product.cost_price_cents)
            .bind(product.selling_price_cents)
            .bind(product.is_active)
            .bind(product.created_at)
            .bind(product.updated_at)
            .execute(&self.pool)
            .await;

            match result {
                Ok(_) => Ok(()),
                Err(err) if crate::error::is_unique_violation(&err) => {
                    Err(DbError::duplicate("products.code", product.code.clone()))
                }
                Err(err) => Err(err.into()),
            }
        })
        .await?;

        info!(id = %product.id, code = %product.code, "Product inserted");
        Ok(product)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        with_deadline(self.timeout, "products.get_by_id", fetch_product(&self.pool, id)).await
    }

    /// Gets a product by its catalog code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        with_deadline(self.timeout, "products.get_by_code", async {
            let product = sqlx::query_as::<_, Product>(product_select!("WHERE code = ?1"))
                .bind(code.trim())
                .fetch_optional(&self.pool)
                .await?;
            Ok(product)
        })
        .await
    }

    /// Attaches a photo URL; it goes after the product's existing photos.
    pub async fn add_photo(&self, product_id: &str, url: &str) -> DbResult<ProductPhoto> {
        if url.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "url".to_string(),
            }
            .into());
        }

        with_deadline(self.timeout, "products.add_photo", async {
            if fetch_product(&self.pool, product_id).await?.is_none() {
                return Err(CoreError::ProductNotFound(product_id.to_string()).into());
            }

            let id = Uuid::new_v4().to_string();
            let created_at = Utc::now();
            let position: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO product_photos (id, product_id, url, position, created_at)
                SELECT ?1, ?2, ?3, COALESCE(MAX(position) + 1, 0), ?4
                FROM product_photos WHERE product_id = ?2
                RETURNING position
                "#,
            )
            .bind(&id)
            .bind(product_id)
            .bind(url.trim())
            .bind(created_at)
            .fetch_one(&self.pool)
            .await?;

            Ok(ProductPhoto {
                id,
                product_id: product_id.to_string(),
                url: url.trim().to_string(),
                position,
                created_at,
            })
        })
        .await
    }

    /// Lists active products with category, photos and ledger stock.
    pub async fn list_with_stock(&self) -> DbResult<Vec<ProductWithStock>> {
        with_deadline(self.timeout, "products.list_with_stock", async {
            let rows: Vec<ProductStockRow> = sqlx::query_as(
                r#"
                SELECT
                    p.id, p.code, p.name, p.description, p.category_id,
                    p.cost_price_cents, p.selling_price_cents, p.is_active,
                    p.created_at, p.updated_at,
                    c.name AS category_name,
                    (SELECT COALESCE(SUM(m.quantity), 0)
                     FROM inventory_movements m
                     WHERE m.product_id = p.id) AS current_stock
                FROM products p
                LEFT JOIN categories c ON c.id = p.category_id
                WHERE p.is_active = 1
                ORDER BY p.code
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

            let photos: Vec<ProductPhoto> = sqlx::query_as(
                r#"
                SELECT id, product_id, url, position, created_at
                FROM product_photos
                ORDER BY product_id, position
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

            let mut photos_by_product: HashMap<String, Vec<ProductPhoto>> = HashMap::new();
            for photo in photos {
                photos_by_product
                    .entry(photo.product_id.clone())
                    .or_default()
                    .push(photo);
            }

            debug!(count = rows.len(), "Listed products with stock");

            Ok(rows
                .into_iter()
                .map(|row| {
                    let photos = photos_by_product.remove(&row.product.id).unwrap_or_default();
                    ProductWithStock {
                        product: row.product,
                        category_name: row.category_name,
                        photos,
                        current_stock: row.current_stock,
                    }
                })
                .collect())
        })
        .await
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        with_deadline(self.timeout, "products.count", async {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count)
        })
        .await
    }
}

/// Loads a product on any executor (pool, connection or transaction).
pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let product = sqlx::query_as::<_, Product>(product_select!("WHERE id = ?1"))
        .bind(id.to_owned())
        .fetch_optional(executor)
        .await?;
    Ok(product)
}

/// Loads the given products keyed by id. Unknown ids are skipped.
pub(crate) async fn fetch_products_by_ids(
    conn: &mut SqliteConnection,
    ids: impl IntoIterator<Item = &str>,
) -> DbResult<HashMap<String, Product>> {
    let mut products = HashMap::new();
    for id in ids {
        if products.contains_key(id) {
            continue;
        }
        if let Some(product) = fetch_product(&mut *conn, id).await? {
            products.insert(product.id.clone(), product);
        }
    }
    Ok(products)
}

// =============================================================================
// Unit Tests
// =============================================================================
