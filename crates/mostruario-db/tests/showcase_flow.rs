//! End-to-end showcase flows against a file-backed database, including
//! concurrent writers racing on the same stock, showcase and sale.

use std::path::PathBuf;

use mostruario_core::settlement::{CommissionMode, RegisterSaleRequest, SaleLineInput};
use mostruario_core::showcase::{
    CreateShowcaseRequest, ReturnLineInput, ShowcaseFilter, ShowcaseLineInput,
};
use mostruario_core::{CoreError, Money, ShowcaseStatus};
use mostruario_db::{Database, DbConfig, DbError, NewDistributor, NewProduct};
use uuid::Uuid;

/// Temporary database file, removed with its WAL files on drop.
struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("mostruario-test-{}.db", Uuid::new_v4()));
        TempDb { path }
    }

    async fn open(&self) -> Database {
        Database::new(DbConfig::new(&self.path).max_connections(4))
            .await
            .unwrap()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        for suffix in ["-wal", "-shm"] {
            let mut side = self.path.clone().into_os_string();
            side.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(side));
        }
    }
}

struct Setup {
    db: Database,
    distributor_id: String,
    product_id: String,
}

async fn setup(db: Database, stock: i64) -> Setup {
    let distributor = db
        .distributors()
        .insert(&NewDistributor {
            name: "Fernanda Alves".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    let product = db
        .products()
        .insert(&NewProduct {
            code: "AN-0500".into(),
            name: "Anel trançado".into(),
            cost_price_cents: 6000,
            selling_price_cents: Some(15000),
            ..Default::default()
        })
        .await
        .unwrap();
    db.ledger().record_movement(&product.id, stock, "Compra").await.unwrap();

    Setup {
        db,
        distributor_id: distributor.id,
        product_id: product.id,
    }
}

fn create_request(s: &Setup, quantity: i64) -> CreateShowcaseRequest {
    CreateShowcaseRequest {
        distributor_id: s.distributor_id.clone(),
        lines: vec![ShowcaseLineInput {
            product_id: s.product_id.clone(),
            quantity,
        }],
    }
}

fn returns(s: &Setup, returned: i64) -> Vec<ReturnLineInput> {
    vec![ReturnLineInput {
        product_id: s.product_id.clone(),
        returned_quantity: returned,
    }]
}

fn sale_request(s: &Setup, showcase_id: &str, price: i64, bps: i64) -> RegisterSaleRequest {
    RegisterSaleRequest {
        showcase_id: showcase_id.to_string(),
        lines: vec![SaleLineInput {
            product_id: s.product_id.clone(),
            unit_price_cents: price,
            commission_bps: None,
        }],
        mode: CommissionMode::Global { commission_bps: bps },
        description: None,
    }
}

#[tokio::test]
async fn full_consignment_cycle() {
    let temp = TempDb::new();
    let s = setup(temp.open().await, 10).await;

    let showcase = s.db.showcases().create(&create_request(&s, 4)).await.unwrap();
    assert_eq!(s.db.ledger().current_stock(&s.product_id).await.unwrap(), 6);
    assert_eq!(
        s.db.showcases().status(&showcase.id).await.unwrap(),
        ShowcaseStatus::Active
    );

    let held = s.db.holdings().distributor_held_stock(&s.distributor_id).await.unwrap();
    assert_eq!(held.len(), 1);
    assert_eq!(held[0].quantity, 4);

    let status = s.db.showcases().finish(&showcase.id, &returns(&s, 1)).await.unwrap();
    assert_eq!(status, ShowcaseStatus::Finalized);
    assert!(s
        .db
        .holdings()
        .distributor_held_stock(&s.distributor_id)
        .await
        .unwrap()
        .is_empty());

    let summary = s
        .db
        .sales()
        .register_sale(&sale_request(&s, &showcase.id, 10000, 1000))
        .await
        .unwrap();
    assert_eq!(summary.totals.units, 3);
    assert_eq!(summary.totals.total, Money::from_cents(30000));
    assert_eq!(summary.totals.commission, Money::from_cents(3000));
    assert_eq!(
        s.db.showcases().status(&showcase.id).await.unwrap(),
        ShowcaseStatus::Settled
    );

    let err = s
        .db
        .sales()
        .register_sale(&sale_request(&s, &showcase.id, 10000, 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::DuplicateSale(_))));
    assert_eq!(err.kind(), mostruario_core::ErrorKind::Conflict);

    let listed = s.db.showcases().list(&ShowcaseFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status, ShowcaseStatus::Settled);
    assert_eq!(listed[0].totals.sale_total_cents, Some(30000));
    assert_eq!(listed[0].totals.commission_cents, Some(3000));

    // Returns are not restocked by default.
    assert_eq!(s.db.ledger().current_stock(&s.product_id).await.unwrap(), 6);

    s.db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_never_oversell() {
    let temp = TempDb::new();
    let s = setup(temp.open().await, 5).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let showcases = s.db.showcases();
        let request = create_request(&s, 4);
        handles.push(tokio::spawn(async move { showcases.create(&request).await }));
    }

    let mut created = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(DbError::Domain(CoreError::InsufficientStock { .. })) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(rejected, 1);
    assert_eq!(s.db.ledger().current_stock(&s.product_id).await.unwrap(), 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM showcases")
        .fetch_one(s.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    s.db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_get_distinct_codes() {
    let temp = TempDb::new();
    let s = setup(temp.open().await, 50).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let showcases = s.db.showcases();
        let request = create_request(&s, 2);
        handles.push(tokio::spawn(async move { showcases.create(&request).await }));
    }

    let mut codes = Vec::new();
    for handle in handles {
        codes.push(handle.await.unwrap().unwrap().code);
    }
    codes.sort();
    codes.dedup();
    assert_eq!(codes.len(), 5);
    assert!(codes.iter().any(|c| c.ends_with("-0001")));
    assert!(codes.iter().any(|c| c.ends_with("-0005")));
    assert_eq!(s.db.ledger().current_stock(&s.product_id).await.unwrap(), 40);

    s.db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_finish_records_one_set_of_returns() {
    let temp = TempDb::new();
    let s = setup(temp.open().await, 10).await;
    let showcase = s.db.showcases().create(&create_request(&s, 4)).await.unwrap();

    let mut handles = Vec::new();
    for returned in [1, 2] {
        let showcases = s.db.showcases();
        let id = showcase.id.clone();
        let lines = returns(&s, returned);
        handles.push(tokio::spawn(async move { showcases.finish(&id, &lines).await }));
    }

    let mut finished = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => finished += 1,
            Err(DbError::Domain(CoreError::ShowcaseAlreadyFinalized(_))) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(finished, 1);

    let rows = s.db.showcases().returns(&showcase.id).await.unwrap();
    assert_eq!(rows.len(), 1);

    s.db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_settle_once() {
    let temp = TempDb::new();
    let s = setup(temp.open().await, 10).await;
    let showcase = s.db.showcases().create(&create_request(&s, 4)).await.unwrap();
    s.db.showcases().finish(&showcase.id, &returns(&s, 0)).await.unwrap();

    let mut handles = Vec::new();
    for bps in [500, 1500] {
        let sales = s.db.sales();
        let request = sale_request(&s, &showcase.id, 12000, bps);
        handles.push(tokio::spawn(async move { sales.register_sale(&request).await }));
    }

    let mut settled = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => settled += 1,
            Err(DbError::Domain(CoreError::DuplicateSale(_))) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(settled, 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE showcase_id = ?1")
        .bind(&showcase.id)
        .fetch_one(s.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    let sold: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sold_products")
        .fetch_one(s.db.pool())
        .await
        .unwrap();
    assert_eq!(sold, 1);

    s.db.close().await;
}

#[tokio::test]
async fn history_reflects_every_stage() {
    let temp = TempDb::new();
    let s = setup(temp.open().await, 20).await;

    let no_sale = s.db.showcases().create(&create_request(&s, 2)).await.unwrap();
    s.db.showcases().finish(&no_sale.id, &returns(&s, 2)).await.unwrap();

    let pending = s.db.showcases().create(&create_request(&s, 3)).await.unwrap();
    s.db.showcases().finish(&pending.id, &returns(&s, 1)).await.unwrap();

    let active = s.db.showcases().create(&create_request(&s, 1)).await.unwrap();

    let history = s
        .db
        .holdings()
        .showcase_history(&s.distributor_id, None)
        .await
        .unwrap();
    let statuses: Vec<(String, ShowcaseStatus)> = history
        .iter()
        .map(|h| (h.showcase_id.clone(), h.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (active.id.clone(), ShowcaseStatus::Active),
            (pending.id.clone(), ShowcaseStatus::Finalized),
            (no_sale.id.clone(), ShowcaseStatus::FinalizedNoSale),
        ]
    );
    assert_eq!(history[1].totals.units_sold, 2);
    assert_eq!(history[1].totals.sale_total_cents, None);

    let err = s
        .db
        .sales()
        .register_sale(&sale_request(&s, &no_sale.id, 15000, 1000))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Domain(CoreError::NothingToSettle(_))));

    s.db.close().await;
}

#[tokio::test]
async fn operation_deadline_is_retryable() {
    let temp = TempDb::new();
    let s = setup(temp.open().await, 5).await;

    // Hold the write lock so the create cannot start its transaction.
    let mut blocker = s.db.pool().begin().await.unwrap();
    sqlx::query("INSERT INTO categories (id, name, created_at) VALUES ('lock', 'lock', '2026-01-01T00:00:00Z')")
        .execute(&mut *blocker)
        .await
        .unwrap();

    let short = Database::new(
        DbConfig::new(&temp.path)
            .run_migrations(false)
            .operation_timeout(std::time::Duration::from_millis(200)),
    )
    .await
    .unwrap();

    let err = short.showcases().create(&create_request(&s, 1)).await.unwrap_err();
    assert!(err.is_retryable(), "expected retryable error, got {err:?}");

    blocker.rollback().await.unwrap();
    assert_eq!(s.db.ledger().current_stock(&s.product_id).await.unwrap(), 5);

    short.close().await;
    s.db.close().await;
}
