//! HTTP handlers for product and movement entry

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Movement, Product};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::inventory::{
    CreateProductInput, InventoryService, RecordMovementInput, StocktakeInput,
};
use crate::AppState;

fn service(state: &AppState) -> InventoryService {
    InventoryService::new(state.store.clone(), state.ledger.clone())
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = service(&state).create_product(input)?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Get a product with its baseline balances
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let product = service(&state).get_product(product_id)?;
    Ok(Json(product))
}

/// Record a stocktake for a product
pub async fn record_stocktake(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(input): Json<StocktakeInput>,
) -> AppResult<Json<Product>> {
    let product = service(&state).record_stocktake(product_id, input)?;
    Ok(Json(product))
}

/// Record a stock movement
pub async fn record_movement(
    State(state): State<AppState>,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<(StatusCode, Json<Movement>)> {
    let movement = service(&state).record_movement(input)?;
    Ok((StatusCode::CREATED, Json(movement)))
}

/// Delete a stock movement
pub async fn delete_movement(
    State(state): State<AppState>,
    Path(movement_id): Path<Uuid>,
) -> AppResult<Json<Movement>> {
    let movement = service(&state).delete_movement(movement_id)?;
    Ok(Json(movement))
}
