//! Ledger API tests
//!
//! Tests the HTTP surface end to end over an in-memory store:
//! - Product and movement entry with validation
//! - Per-product reconciliation and cache invalidation on delete
//! - Scope reports and taxonomy lookup

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use shared::{PoolBalances, Product, ReportWindow, WarehouseScope};
use std::str::FromStr;
use stock_ledger_backend::{create_app, AppState, Config};
use tower::ServiceExt;

const DATE: &str = "2024-03-02T10:00:00Z";

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn app() -> (Router, AppState) {
    let state = AppState::new(Config::default()).unwrap();
    (create_app(state.clone()), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn create_product(app: &Router, scope: &str, opening: Value) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/products",
        Some(json!({
            "name": "Wheat",
            "unit": "kg",
            "warehouse_scope": scope,
            "opening": opening,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

async fn record(
    app: &Router,
    product_id: &str,
    scope: &str,
    kind: &str,
    context: &str,
    date: &str,
    qty: &str,
) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/movements",
        Some(json!({
            "date": date,
            "kind": kind,
            "warehouse_scope": scope,
            "context": context,
            "lines": [{ "product_id": product_id, "quantity": qty, "unit": "kg" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => dec(s),
        Value::Number(n) => dec(&n.to_string()),
        other => panic!("not a decimal: {other}"),
    }
}

// ============================================================================
// API Tests
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_two_pool_product_balance() {
    let (app, _) = app();
    let id = create_product(&app, "raw", json!(["200"])).await;
    record(&app, &id, "raw", "out", "warehouse-issue", DATE, "40").await;

    let uri = format!("/api/v1/ledger/products/{id}?start=2024-03-01&end=2024-03-31");
    let (status, body) = send(&app, "GET", &uri, None).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(decimal(&body["closing"][0]), dec("160"));
    assert_eq!(decimal(&body["closing"][1]), dec("40"));
    assert_eq!(decimal(&body["category_totals"]["warehouse-issue"]), dec("40"));
}

#[tokio::test]
async fn test_delete_movement_recomputes_balance() {
    let (app, _) = app();
    let id = create_product(&app, "parts", json!(["100"])).await;
    record(&app, &id, "parts", "in", "incoming-purchase", DATE, "50").await;
    let issue = record(
        &app,
        &id,
        "parts",
        "out",
        "generic-issue",
        "2024-03-03T10:00:00Z",
        "30",
    )
    .await;

    let uri = format!("/api/v1/ledger/products/{id}?end=2024-03-31");
    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(decimal(&body["closing"][0]), dec("120"));

    let issue_id = issue["id"].as_str().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/movements/{issue_id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(decimal(&body["closing"][0]), dec("150"));
}

#[tokio::test]
async fn test_stocktake_replaces_baseline() {
    let (app, _) = app();
    let id = create_product(&app, "parts", json!(["100"])).await;
    record(&app, &id, "parts", "in", "incoming-purchase", DATE, "50").await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/products/{id}/stocktake"),
        Some(json!({ "counts": ["140"], "at": "2024-03-05T00:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let uri = format!("/api/v1/ledger/products/{id}?end=2024-03-31");
    let (_, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(decimal(&body["closing"][0]), dec("140"));
}

#[tokio::test]
async fn test_movement_validation_errors() {
    let (app, _) = app();
    let id = create_product(&app, "parts", json!([])).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/movements",
        Some(json!({
            "kind": "in",
            "warehouse_scope": "parts",
            "context": "Incoming Purchase",
            "lines": [{ "product_id": id, "quantity": "5", "unit": "kg" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/movements",
        Some(json!({
            "kind": "in",
            "warehouse_scope": "parts",
            "context": "incoming-purchase",
            "lines": [{ "product_id": id, "quantity": "-5", "unit": "kg" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Line product lives in another scope
    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/movements",
        Some(json!({
            "kind": "in",
            "warehouse_scope": "catering",
            "context": "incoming-purchase",
            "lines": [{ "product_id": id, "quantity": "5", "unit": "kg" }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let (app, _) = app();
    let uri = format!("/api/v1/ledger/products/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_inverted_window_rejected() {
    let (app, _) = app();
    let id = create_product(&app, "parts", json!(["1"])).await;
    let uri = format!("/api/v1/ledger/products/{id}?start=2024-03-10&end=2024-03-01");
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_WINDOW");
}

#[tokio::test]
async fn test_scope_report_lists_products() {
    let (app, _) = app();
    let a = create_product(&app, "parts", json!(["10"])).await;
    let b = create_product(&app, "parts", json!(["20"])).await;
    create_product(&app, "catering", json!(["99"])).await;
    record(&app, &a, "parts", "in", "incoming-purchase", DATE, "5").await;

    let uri = "/api/v1/ledger/report?scope=parts&end=2024-03-31";
    let (status, body) = send(&app, "GET", uri, None).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["outcome"]["status"], "reconciled");
        let closing = decimal(&row["outcome"]["closing"][0]);
        if row["product_id"] == a.as_str() {
            assert_eq!(closing, dec("15"));
        } else {
            assert_eq!(row["product_id"], b.as_str());
            assert_eq!(closing, dec("20"));
        }
    }
}

#[tokio::test]
async fn test_taxonomy_endpoint() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/api/v1/ledger/taxonomy/raw", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "two_pool");
    assert_eq!(body["pools"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, "GET", "/api/v1/ledger/taxonomy/parts", None).await;
    assert_eq!(body["name"], "single_pool");
}

#[tokio::test]
async fn test_default_end_requests_bypass_cache() {
    let (app, state) = app();
    let id = create_product(&app, "parts", json!(["10"])).await;
    let live = format!("/api/v1/ledger/products/{id}");

    for _ in 0..50 {
        let (status, body) = send(&app, "GET", &live, None).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(decimal(&body["closing"][0]), dec("10"));
    }
    assert_eq!(state.ledger.cache_len(), 0);

    let pinned = format!("/api/v1/ledger/products/{id}?end=2024-03-31");
    send(&app, "GET", &pinned, None).await;
    send(&app, "GET", &pinned, None).await;
    assert_eq!(state.ledger.cache_len(), 1);
}

#[test]
fn test_cache_size_is_capped() {
    let mut config = Config::default();
    config.ledger.cache_capacity = 8;
    let state = AppState::new(config).unwrap();

    let product = state
        .store
        .insert_product(Product {
            id: uuid::Uuid::new_v4(),
            name: "Bolts".to_string(),
            unit: "pcs".to_string(),
            warehouse_scope: WarehouseScope::new("parts"),
            opening: PoolBalances::single(dec("3")),
            last_stocktake_at: None,
        })
        .unwrap();

    for _ in 0..200 {
        let row = state
            .ledger
            .reconcile_product(product.id, ReportWindow::as_of_now())
            .unwrap();
        assert_eq!(row.closing_a(), dec("3"));
        assert!(state.ledger.cache_len() <= 8);
    }
}

#[tokio::test]
async fn test_overflowing_balance_is_unprocessable() {
    let (app, _) = app();
    let id = create_product(&app, "parts", json!([Decimal::MAX.to_string()])).await;
    record(&app, &id, "parts", "in", "incoming-purchase", DATE, "1").await;

    let uri = format!("/api/v1/ledger/products/{id}?end=2024-03-31");
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "QUANTITY_OVERFLOW");

    let uri = "/api/v1/ledger/report?scope=parts&end=2024-03-31";
    let (status, body) = send(&app, "GET", uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["outcome"]["status"], "unreconcilable");
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Cached and freshly computed balances agree after every write
    #[test]
    fn prop_cache_never_serves_stale_rows(quantities in prop::collection::vec(1i64..1000, 1..8)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let (app, _) = app();
            let id = create_product(&app, "parts", json!(["0"])).await;
            let uri = format!("/api/v1/ledger/products/{id}?end=2030-01-01");

            let mut expected = Decimal::ZERO;
            for qty in &quantities {
                let qty = qty.to_string();
                record(&app, &id, "parts", "in", "incoming-purchase", DATE, &qty).await;
                expected += Decimal::from_str(&qty).unwrap();

                // Twice: first computes, second may hit the cache
                for _ in 0..2 {
                    let (_, body) = send(&app, "GET", &uri, None).await;
                    assert_eq!(decimal(&body["closing"][0]), expected);
                }
            }
        });
    }
}
