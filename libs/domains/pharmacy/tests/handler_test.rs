//! Handler tests for the Pharmacy domain
//!
//! These drive the pharmacy router directly over the in-memory repository:
//! - Request contracts (400 with field details)
//! - Cart snapshots and checkout status codes
//! - Invoice outcome reporting
//!
//! Authorization is not exercised here; the app's policy table runs in front
//! of this router. Cart routes only need claims in the request extensions.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use axum_helpers::JwtClaims;
use domain_pharmacy::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

// Helper to parse JSON response body
async fn json_body<T: serde::de::DeserializeOwned>(body: Body) -> T {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn cashier() -> JwtClaims {
    JwtClaims {
        sub: Uuid::now_v7().to_string(),
        email: "cashier@clinic.test".into(),
        name: "Cashier".into(),
        roles: vec!["pharmacist".into()],
        abilities: vec!["pharmacy.*".into()],
        exp: i64::MAX,
        iat: 0,
        jti: Uuid::now_v7().to_string(),
    }
}

fn request(method: &str, uri: &str, body: Option<Value>, claims: Option<&JwtClaims>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let mut request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    if let Some(claims) = claims {
        request.extensions_mut().insert(claims.clone());
    }
    request
}

struct FailingIssuer;

#[async_trait]
impl InvoiceIssuer for FailingIssuer {
    async fn issue(&self, _sale: &Sale) -> PharmacyResult<Invoice> {
        Err(PharmacyError::Invoice("numbering service down".into()))
    }
}

struct Fixture {
    repo: Arc<InMemoryPharmacyRepository>,
    app: Router,
}

fn fixture() -> Fixture {
    let repo = Arc::new(InMemoryPharmacyRepository::new());
    let issuer = Arc::new(RepositoryInvoiceIssuer::new(
        Arc::clone(&repo),
        InvoiceConfig::default(),
    ));
    let service = PharmacyService::with_issuer(Arc::clone(&repo), issuer);
    Fixture {
        repo,
        app: handlers::router(service),
    }
}

fn failing_fixture() -> Fixture {
    let repo = Arc::new(InMemoryPharmacyRepository::new());
    let service = PharmacyService::with_issuer(Arc::clone(&repo), Arc::new(FailingIssuer));
    Fixture {
        repo,
        app: handlers::router(service),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_article(app: &Router, code: &str, price: f64, tax: f64) -> i64 {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/articles",
            Some(json!({ "code": code, "name": format!("Article {}", code), "sell_price": price, "tax_rate": tax })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

async fn create_lot(app: &Router, article_id: i64, quantity: i32, expires_at: Option<&str>) -> i64 {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/lots",
            Some(json!({
                "article_id": article_id,
                "lot_number": format!("LOT-{}-{}", article_id, quantity),
                "expires_at": expires_at,
                "quantity": quantity,
            })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_create_article_returns_resource_shape() {
    let Fixture { app, .. } = fixture();

    let response = app
        .oneshot(request(
            "POST",
            "/articles",
            Some(json!({ "code": "PARA500", "name": "Paracetamol 500", "sell_price": 2.5, "tax_rate": 7 })),
            None,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let article: Value = json_body(response.into_body()).await;
    assert!(article["id"].is_i64());
    assert_eq!(article["code"], "PARA500");
    assert_eq!(article["stock"], 0);
    assert_eq!(article["sell_price"], 2.5);
    assert!(article["dci"].is_null());
    assert!(article["brand"].is_null());
}

#[tokio::test]
async fn test_get_article_includes_dci_only_on_request() {
    let Fixture { repo, app } = fixture();
    let dci = repo.insert_dci("Paracetamol").await;

    let (status, created) = send(
        &app,
        request(
            "POST",
            "/articles",
            Some(json!({ "code": "DOLI", "name": "Doliprane", "sell_price": 3, "tax_rate": 0, "dci_id": dci.id })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (_, plain) = send(&app, request("GET", &format!("/articles/{id}"), None, None)).await;
    assert!(plain["dci"].is_null());

    let (status, loaded) =
        send(&app, request("GET", &format!("/articles/{id}?include=dci"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loaded["dci"], json!({ "id": dci.id, "name": "Paracetamol" }));

    // Same input, same output
    let (_, again) =
        send(&app, request("GET", &format!("/articles/{id}?include=dci"), None, None)).await;
    assert_eq!(loaded, again);
}

#[tokio::test]
async fn test_create_article_with_unknown_dci_is_field_error() {
    let Fixture { app, .. } = fixture();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/articles",
            Some(json!({ "code": "X1", "name": "X", "sell_price": 1, "tax_rate": 0, "dci_id": 4242 })),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["dci_id"][0]["code"], "exists");
}

#[tokio::test]
async fn test_duplicate_article_code_conflicts() {
    let Fixture { app, .. } = fixture();
    create_article(&app, "AMOX", 4.0, 7.0).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            "/articles",
            Some(json!({ "code": "AMOX", "name": "Other", "sell_price": 1, "tax_rate": 0 })),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_lot_with_negative_quantity_is_rejected() {
    let Fixture { app, .. } = fixture();
    let article_id = create_article(&app, "IBU", 1.2, 7.0).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/lots",
            Some(json!({ "article_id": article_id, "lot_number": "L1", "quantity": -1 })),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["quantity"].is_array());
}

#[tokio::test]
async fn test_lot_with_bad_expiry_is_rejected() {
    let Fixture { app, .. } = fixture();
    let article_id = create_article(&app, "IBU2", 1.2, 7.0).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/lots",
            Some(json!({ "article_id": article_id, "lot_number": "L1", "quantity": 5, "expires_at": "next week" })),
            None,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["expires_at"][0]["code"], "date");
}

#[tokio::test]
async fn test_lots_list_by_expiry_with_undated_last() {
    let Fixture { app, .. } = fixture();
    let article_id = create_article(&app, "VITC", 5.0, 0.0).await;

    let undated = create_lot(&app, article_id, 1, None).await;
    let late = create_lot(&app, article_id, 2, Some("2099-12-31")).await;
    let early = create_lot(&app, article_id, 3, Some("2098-01-01")).await;

    let (status, lots) = send(
        &app,
        request("GET", &format!("/lots?article_id={article_id}"), None, None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = lots
        .as_array()
        .unwrap()
        .iter()
        .map(|lot| lot["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![early, late, undated]);
}

#[tokio::test]
async fn test_update_and_delete_lot() {
    let Fixture { app, .. } = fixture();
    let article_id = create_article(&app, "ZINC", 2.0, 0.0).await;
    let lot_id = create_lot(&app, article_id, 10, None).await;

    let (status, lot) = send(
        &app,
        request(
            "PATCH",
            &format!("/lots/{lot_id}"),
            Some(json!({ "article_id": article_id, "lot_number": "RENAMED", "quantity": 4, "supplier": "Acme" })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lot["lot_number"], "RENAMED");
    assert_eq!(lot["quantity"], 4);

    let (status, _) = send(&app, request("DELETE", &format!("/lots/{lot_id}"), None, None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, request("DELETE", &format!("/lots/{lot_id}"), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_requires_authenticated_caller() {
    let Fixture { app, .. } = fixture();

    let (status, _) = send(&app, request("GET", "/cart", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_add_to_cart_rejects_zero_quantity() {
    let Fixture { app, .. } = fixture();
    let user = cashier();
    let article_id = create_article(&app, "ASP", 1.0, 0.0).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/cart/items",
            Some(json!({ "article_id": article_id, "quantity": 0 })),
            Some(&user),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["quantity"].is_array());

    let (_, cart) = send(&app, request("GET", "/cart", None, Some(&user))).await;
    assert_eq!(cart["lines"], json!([]));
}

#[tokio::test]
async fn test_add_to_cart_unknown_article_is_field_error() {
    let Fixture { app, .. } = fixture();
    let user = cashier();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/cart/items",
            Some(json!({ "article_id": 999, "quantity": 1 })),
            Some(&user),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["article_id"][0]["code"], "exists");

    let (_, cart) = send(&app, request("GET", "/cart", None, Some(&user))).await;
    assert_eq!(cart["lines"], json!([]));
}

#[tokio::test]
async fn test_cart_line_keeps_price_snapshot() {
    let Fixture { app, .. } = fixture();
    let user = cashier();
    let article_id = create_article(&app, "OMEP", 8.4, 7.0).await;

    let (status, cart) = send(
        &app,
        request(
            "POST",
            "/cart/items",
            Some(json!({ "article_id": article_id, "quantity": 3 })),
            Some(&user),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cart["lines"][0]["quantity"], 3);
    assert_eq!(cart["lines"][0]["unit_price"], 8.4);
    assert_eq!(cart["lines"][0]["tax_rate"], 7.0);

    let (status, _) = send(
        &app,
        request(
            "PATCH",
            &format!("/articles/{article_id}"),
            Some(json!({ "code": "OMEP", "name": "Omeprazole", "sell_price": 12, "tax_rate": 20 })),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Adding again bumps the quantity and keeps the first snapshot
    let (_, cart) = send(
        &app,
        request(
            "POST",
            "/cart/items",
            Some(json!({ "article_id": article_id, "quantity": 1 })),
            Some(&user),
        ),
    )
    .await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
    assert_eq!(cart["lines"][0]["quantity"], 4);
    assert_eq!(cart["lines"][0]["unit_price"], 8.4);
    assert_eq!(cart["lines"][0]["tax_rate"], 7.0);
}

#[tokio::test]
async fn test_remove_line_and_clear_cart() {
    let Fixture { app, .. } = fixture();
    let user = cashier();
    let first = create_article(&app, "A1", 1.0, 0.0).await;
    let second = create_article(&app, "A2", 2.0, 0.0).await;

    for article_id in [first, second] {
        send(
            &app,
            request("POST", "/cart/items", Some(json!({ "article_id": article_id, "quantity": 1 })), Some(&user)),
        )
        .await;
    }

    let (_, cart) = send(&app, request("GET", "/cart", None, Some(&user))).await;
    let line_id = cart["lines"][0]["id"].as_str().unwrap().to_string();

    let (status, cart) = send(
        &app,
        request("DELETE", &format!("/cart/items/{line_id}"), None, Some(&user)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/cart/items/{line_id}"), None, Some(&user)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, cart) = send(&app, request("DELETE", "/cart", None, Some(&user))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["lines"], json!([]));
    assert_eq!(cart["total"], 0.0);
}

#[tokio::test]
async fn test_checkout_empty_cart_is_unprocessable() {
    let Fixture { app, .. } = fixture();
    let user = cashier();

    let (status, _) = send(&app, request("POST", "/cart/checkout", Some(json!({})), Some(&user))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_checkout_rejects_malformed_customer_id() {
    let Fixture { app, .. } = fixture();
    let user = cashier();

    let (status, body) = send(
        &app,
        request("POST", "/cart/checkout", Some(json!({ "customer_id": "not-a-uuid" })), Some(&user)),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["customer_id"].is_array());
}

#[tokio::test]
async fn test_checkout_with_invoice_issues_it() {
    let Fixture { app, .. } = fixture();
    let user = cashier();
    let article_id = create_article(&app, "CETI", 10.0, 20.0).await;
    create_lot(&app, article_id, 5, Some("2099-01-01")).await;

    send(
        &app,
        request("POST", "/cart/items", Some(json!({ "article_id": article_id, "quantity": 2 })), Some(&user)),
    )
    .await;

    let (status, result) = send(
        &app,
        request("POST", "/cart/checkout", Some(json!({ "auto_invoice": true, "notes": "counter" })), Some(&user)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED, "{result}");
    assert_eq!(result["invoice_status"], "issued");
    assert!(result["invoice"]["number"].as_str().unwrap().starts_with("INV-"));
    assert_eq!(result["sale"]["subtotal"], 20.0);
    assert_eq!(result["sale"]["tax_total"], 4.0);
    assert_eq!(result["sale"]["total"], 24.0);
    assert!(result["invoice_error"].is_null());

    let sale_id = result["sale"]["id"].as_i64().unwrap();
    let (status, sale) = send(&app, request("GET", &format!("/sales/{sale_id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sale["invoice"]["number"], result["invoice"]["number"]);
}

#[tokio::test]
async fn test_checkout_without_flag_does_not_invoice() {
    let Fixture { app, .. } = fixture();
    let user = cashier();
    let article_id = create_article(&app, "LORA", 3.0, 0.0).await;
    create_lot(&app, article_id, 5, None).await;

    send(
        &app,
        request("POST", "/cart/items", Some(json!({ "article_id": article_id, "quantity": 1 })), Some(&user)),
    )
    .await;

    let (status, result) =
        send(&app, request("POST", "/cart/checkout", Some(json!({})), Some(&user))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["invoice_status"], "not_requested");
    assert!(result["invoice"].is_null());
}

#[tokio::test]
async fn test_checkout_invoice_failure_keeps_sale() {
    let Fixture { app, .. } = failing_fixture();
    let user = cashier();
    let article_id = create_article(&app, "METF", 6.0, 0.0).await;
    create_lot(&app, article_id, 5, None).await;

    send(
        &app,
        request("POST", "/cart/items", Some(json!({ "article_id": article_id, "quantity": 2 })), Some(&user)),
    )
    .await;

    let (status, result) = send(
        &app,
        request("POST", "/cart/checkout", Some(json!({ "auto_invoice": true })), Some(&user)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(result["invoice_status"], "failed");
    assert!(result["invoice"].is_null());
    assert!(result["invoice_error"].as_str().unwrap().contains("numbering service down"));

    let (_, article) = send(&app, request("GET", &format!("/articles/{article_id}"), None, None)).await;
    assert_eq!(article["stock"], 3);

    let (_, cart) = send(&app, request("GET", "/cart", None, Some(&user))).await;
    assert_eq!(cart["lines"], json!([]));

    let sale_id = result["sale"]["id"].as_i64().unwrap();
    let (status, sale) = send(&app, request("GET", &format!("/sales/{sale_id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sale["invoice"].is_null());
}

#[tokio::test]
async fn test_checkout_takes_earliest_expiry_first() {
    let Fixture { app, .. } = fixture();
    let user = cashier();
    let article_id = create_article(&app, "AMLO", 2.0, 0.0).await;
    let undated = create_lot(&app, article_id, 10, None).await;
    let soon = create_lot(&app, article_id, 2, Some("2090-01-01")).await;
    let later = create_lot(&app, article_id, 2, Some("2095-01-01")).await;

    send(
        &app,
        request("POST", "/cart/items", Some(json!({ "article_id": article_id, "quantity": 5 })), Some(&user)),
    )
    .await;

    let (status, result) =
        send(&app, request("POST", "/cart/checkout", Some(json!({})), Some(&user))).await;
    assert_eq!(status, StatusCode::CREATED);

    let drawn: Vec<(i64, i64)> = result["sale"]["lines"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| (line["lot_id"].as_i64().unwrap(), line["quantity"].as_i64().unwrap()))
        .collect();
    assert_eq!(drawn, vec![(soon, 2), (later, 2), (undated, 1)]);
}

#[tokio::test]
async fn test_checkout_insufficient_stock_touches_nothing() {
    let Fixture { app, .. } = fixture();
    let user = cashier();
    let article_id = create_article(&app, "SALB", 9.0, 0.0).await;
    create_lot(&app, article_id, 2, None).await;

    send(
        &app,
        request("POST", "/cart/items", Some(json!({ "article_id": article_id, "quantity": 3 })), Some(&user)),
    )
    .await;

    let (status, _) = send(&app, request("POST", "/cart/checkout", Some(json!({})), Some(&user))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, article) = send(&app, request("GET", &format!("/articles/{article_id}"), None, None)).await;
    assert_eq!(article["stock"], 2);

    let (_, cart) = send(&app, request("GET", "/cart", None, Some(&user))).await;
    assert_eq!(cart["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_lot_sold_from_cannot_be_deleted() {
    let Fixture { app, .. } = fixture();
    let user = cashier();
    let article_id = create_article(&app, "KEEP", 1.0, 0.0).await;
    let lot_id = create_lot(&app, article_id, 3, None).await;

    send(
        &app,
        request("POST", "/cart/items", Some(json!({ "article_id": article_id, "quantity": 1 })), Some(&user)),
    )
    .await;
    let (status, _) = send(&app, request("POST", "/cart/checkout", Some(json!({})), Some(&user))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, request("DELETE", &format!("/lots/{lot_id}"), None, None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_get_unknown_sale_is_not_found() {
    let Fixture { app, .. } = fixture();

    let (status, body) = send(&app, request("GET", "/sales/12345", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_list_articles_search_and_dcis() {
    let Fixture { repo, app } = fixture();
    repo.insert_dci("Ibuprofen").await;
    repo.insert_dci("Amoxicillin").await;
    create_article(&app, "SRCH1", 1.0, 0.0).await;
    create_article(&app, "OTHER", 1.0, 0.0).await;

    let (status, articles) = send(&app, request("GET", "/articles?search=srch", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(articles.as_array().unwrap().len(), 1);
    assert_eq!(articles[0]["code"], "SRCH1");

    let (status, dcis) = send(&app, request("GET", "/dcis", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dcis[0]["name"], "Amoxicillin");
    assert_eq!(dcis[1]["name"], "Ibuprofen");
}
