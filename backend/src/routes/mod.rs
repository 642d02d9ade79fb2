//! Route definitions for the stock ledger service

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/products", product_routes())
        .nest("/movements", movement_routes())
        .nest("/ledger", ledger_routes())
}

/// Product management routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_product))
        .route("/:product_id", get(handlers::get_product))
        .route("/:product_id/stocktake", post(handlers::record_stocktake))
}

/// Movement entry routes
fn movement_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::record_movement))
        .route("/:movement_id", delete(handlers::delete_movement))
}

/// Reconciliation report routes
fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/products/:product_id", get(handlers::get_product_balance))
        .route("/report", get(handlers::get_scope_report))
        .route("/taxonomy/:scope", get(handlers::get_taxonomy))
}
