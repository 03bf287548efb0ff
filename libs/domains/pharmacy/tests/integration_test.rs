//! PostgreSQL repository tests for the Pharmacy domain.
//!
//! Each test starts its own Postgres container, so they are ignored by
//! default. Run with `cargo test -p domain_pharmacy -- --ignored`.

use chrono::NaiveDate;
use domain_pharmacy::models::{CheckoutOrder, LotFilter, NewArticle, NewLot};
use domain_pharmacy::*;
use rust_decimal::Decimal;
use test_utils::{TestDataBuilder, TestDatabase};

fn article(code: String, price: i64) -> NewArticle {
    NewArticle {
        code,
        name: "Integration article".into(),
        form: Some("tablet".into()),
        dosage: None,
        unit: None,
        sell_price: Decimal::new(price, 0),
        tax_rate: Decimal::new(10, 0),
        dci_id: None,
        image: None,
    }
}

fn lot(article_id: i64, number: String, quantity: i32, expires_at: Option<NaiveDate>) -> NewLot {
    NewLot {
        article_id,
        lot_number: number,
        expires_at,
        quantity,
        buy_price: None,
        sell_price: None,
        supplier: None,
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_stock_is_sum_of_lots() {
    let db = TestDatabase::new().await;
    let repo = PgPharmacyRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_stock_sum");

    let created = repo.create_article(article(builder.article_code("a"), 5)).await.unwrap();
    assert_eq!(created.stock, 0);

    repo.create_lot(lot(created.id, builder.lot_number("1"), 4, None)).await.unwrap();
    repo.create_lot(lot(created.id, builder.lot_number("2"), 6, None)).await.unwrap();

    let loaded = repo.get_article(created.id, false).await.unwrap().unwrap();
    assert_eq!(loaded.article.stock, 10);
    assert!(loaded.dci.is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_duplicate_code_maps_to_conflict() {
    let db = TestDatabase::new().await;
    let repo = PgPharmacyRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_duplicate_code");

    repo.create_article(article(builder.article_code("dup"), 1)).await.unwrap();
    let result = repo.create_article(article(builder.article_code("dup"), 2)).await;

    assert!(matches!(result, Err(PharmacyError::DuplicateArticleCode(_))));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_lots_order_nulls_last() {
    let db = TestDatabase::new().await;
    let repo = PgPharmacyRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_lot_order");

    let a = repo.create_article(article(builder.article_code("lots"), 1)).await.unwrap();
    let undated = repo.create_lot(lot(a.id, builder.lot_number("u"), 1, None)).await.unwrap();
    let dated = repo
        .create_lot(lot(a.id, builder.lot_number("d"), 1, NaiveDate::from_ymd_opt(2030, 1, 1)))
        .await
        .unwrap();

    let lots = repo
        .list_lots(LotFilter {
            article_id: Some(a.id),
            ..LotFilter::default()
        })
        .await
        .unwrap();
    let ids: Vec<i64> = lots.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![dated.id, undated.id]);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_checkout_decrements_fefo_and_invoices() {
    let db = TestDatabase::new().await;
    let repo = PgPharmacyRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_checkout");
    let owner = builder.user_id();

    let a = repo.create_article(article(builder.article_code("co"), 10)).await.unwrap();
    let expired = repo
        .create_lot(lot(a.id, builder.lot_number("x"), 9, NaiveDate::from_ymd_opt(2026, 1, 1)))
        .await
        .unwrap();
    let soon = repo
        .create_lot(lot(a.id, builder.lot_number("s"), 2, NaiveDate::from_ymd_opt(2026, 7, 1)))
        .await
        .unwrap();
    let undated = repo.create_lot(lot(a.id, builder.lot_number("n"), 5, None)).await.unwrap();

    repo.add_to_cart(owner, a.id, 2).await.unwrap();
    let cart = repo.add_to_cart(owner, a.id, 1).await.unwrap();
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.lines[0].quantity, 3);

    let sale = repo
        .checkout(owner, CheckoutOrder { customer_id: None, notes: None }, today())
        .await
        .unwrap();
    assert_eq!(sale.total, Decimal::new(3300, 2));
    let drawn: Vec<(i64, i32)> = sale.lines.iter().map(|l| (l.lot_id, l.quantity)).collect();
    assert_eq!(drawn, vec![(soon.id, 2), (undated.id, 1)]);

    let lots = repo
        .list_lots(LotFilter {
            article_id: Some(a.id),
            ..LotFilter::default()
        })
        .await
        .unwrap();
    let quantity = |id: i64| lots.iter().find(|l| l.id == id).unwrap().quantity;
    assert_eq!(quantity(expired.id), 9);
    assert_eq!(quantity(soon.id), 0);
    assert_eq!(quantity(undated.id), 4);

    assert!(repo.get_cart(owner).await.unwrap().lines.is_empty());

    let first = repo.create_invoice(sale.id, "INV".into(), chrono::Utc::now()).await.unwrap();
    assert!(first.number.ends_with("-000001"));
    assert!(matches!(
        repo.create_invoice(sale.id, "INV".into(), chrono::Utc::now()).await,
        Err(PharmacyError::AlreadyInvoiced(_))
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_insufficient_stock_rolls_back() {
    let db = TestDatabase::new().await;
    let repo = PgPharmacyRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_insufficient");
    let owner = builder.user_id();

    let a = repo.create_article(article(builder.article_code("low"), 1)).await.unwrap();
    repo.create_lot(lot(a.id, builder.lot_number("1"), 1, None)).await.unwrap();
    repo.add_to_cart(owner, a.id, 2).await.unwrap();

    let result = repo
        .checkout(owner, CheckoutOrder { customer_id: None, notes: None }, today())
        .await;
    assert!(matches!(result, Err(PharmacyError::InsufficientStock { .. })));

    let loaded = repo.get_article(a.id, false).await.unwrap().unwrap();
    assert_eq!(loaded.article.stock, 1);
    assert_eq!(repo.get_cart(owner).await.unwrap().lines.len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_add_racing_checkout_is_sold_or_kept() {
    let db = TestDatabase::new().await;
    let repo = PgPharmacyRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_add_race");
    let owner = builder.user_id();

    let first = repo.create_article(article(builder.article_code("r1"), 1)).await.unwrap();
    let second = repo.create_article(article(builder.article_code("r2"), 1)).await.unwrap();
    repo.create_lot(lot(first.id, builder.lot_number("1"), 50, None)).await.unwrap();
    repo.create_lot(lot(second.id, builder.lot_number("2"), 50, None)).await.unwrap();

    for _ in 0..10 {
        repo.add_to_cart(owner, first.id, 1).await.unwrap();
        let order = CheckoutOrder { customer_id: None, notes: None };
        let (sale, added) = tokio::join!(
            repo.checkout(owner, order, today()),
            repo.add_to_cart(owner, second.id, 1),
        );
        added.unwrap();
        let sale = sale.unwrap();

        let sold_second = sale.lines.iter().any(|l| l.article_id == second.id);
        let cart = repo.get_cart(owner).await.unwrap();
        let kept_second = cart.lines.iter().any(|l| l.article_id == second.id);
        assert!(sold_second ^ kept_second, "second article was lost or duplicated");

        repo.clear_cart(owner).await.unwrap();
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_add_past_i32_is_quantity_error() {
    let db = TestDatabase::new().await;
    let repo = PgPharmacyRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_add_overflow");
    let owner = builder.user_id();

    let free = repo.create_article(article(builder.article_code("free"), 0)).await.unwrap();
    repo.add_to_cart(owner, free.id, i32::MAX).await.unwrap();

    match repo.add_to_cart(owner, free.id, 5).await {
        Err(PharmacyError::Validation(errors)) => {
            assert!(errors.field_errors().contains_key("quantity"));
        }
        other => panic!("expected a quantity error, got {other:?}"),
    }
    assert_eq!(repo.get_cart(owner).await.unwrap().lines[0].quantity, i32::MAX);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_invoice_sequence_per_prefix() {
    let db = TestDatabase::new().await;
    let repo = PgPharmacyRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pg_invoice_prefix");
    let owner = builder.user_id();

    let a = repo.create_article(article(builder.article_code("inv"), 1)).await.unwrap();
    repo.create_lot(lot(a.id, builder.lot_number("1"), 10, None)).await.unwrap();

    let mut numbers = Vec::new();
    for prefix in ["INV", "FAC"] {
        repo.add_to_cart(owner, a.id, 1).await.unwrap();
        let sale = repo
            .checkout(owner, CheckoutOrder { customer_id: None, notes: None }, today())
            .await
            .unwrap();
        let invoice = repo.create_invoice(sale.id, prefix.into(), chrono::Utc::now()).await.unwrap();
        numbers.push(invoice.number);
    }

    assert!(numbers[0].starts_with("INV-") && numbers[0].ends_with("-000001"));
    assert!(numbers[1].starts_with("FAC-") && numbers[1].ends_with("-000001"));
}
