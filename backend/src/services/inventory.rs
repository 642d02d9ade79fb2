//! Inventory entry service for products, movements and stocktakes

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    validate_movement, validate_stocktake_counts, validate_tag, validate_unit, Movement,
    MovementKind, MovementLine, MovementMode, PoolBalances, Product, ProductStore,
    WarehouseScope,
};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::services::LedgerService;
use crate::store::InMemoryStore;

/// Inventory service for recording stock data
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<InMemoryStore>,
    ledger: Arc<LedgerService>,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    pub id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom = "unit_field")]
    pub unit: String,
    #[validate(custom = "tag_field")]
    pub warehouse_scope: String,
    /// Baseline per pool; missing pools start at zero
    #[serde(default)]
    pub opening: Vec<Decimal>,
}

/// Input for recording a movement
#[derive(Debug, Deserialize, Validate)]
pub struct RecordMovementInput {
    pub id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
    pub kind: MovementKind,
    #[validate(custom = "tag_field")]
    pub warehouse_scope: String,
    #[validate(custom = "tag_field")]
    pub context: String,
    #[serde(default)]
    pub mode: MovementMode,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub reason: String,
    #[validate(length(min = 1))]
    pub lines: Vec<MovementLine>,
}

/// Input for a stocktake
#[derive(Debug, Deserialize)]
pub struct StocktakeInput {
    pub counts: Vec<Decimal>,
    pub at: Option<DateTime<Utc>>,
}

fn tag_field(value: &str) -> Result<(), ValidationError> {
    validate_tag(value).map_err(|msg| field_error("tag", msg))
}

fn unit_field(value: &str) -> Result<(), ValidationError> {
    validate_unit(value).map_err(|msg| field_error("unit", msg))
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(store: Arc<InMemoryStore>, ledger: Arc<LedgerService>) -> Self {
        Self { store, ledger }
    }

    /// Register a product with its baseline balances
    pub fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;
        if input.opening.iter().any(|v| *v < Decimal::ZERO) {
            return Err(AppError::Validation {
                field: "opening".to_string(),
                message: "Opening balances cannot be negative".to_string(),
            });
        }

        let scope = WarehouseScope::new(input.warehouse_scope);
        let pool_count = self.ledger.taxonomy_for(&scope).pool_count();
        let opening = PoolBalances::from_values(input.opening).padded(pool_count)?;

        let product = Product {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            name: input.name.trim().to_string(),
            unit: input.unit.trim().to_string(),
            warehouse_scope: scope,
            opening,
            last_stocktake_at: None,
        };

        tracing::info!(
            product_id = %product.id,
            scope = %product.warehouse_scope,
            "Creating product"
        );
        self.store.insert_product(product)
    }

    pub fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        self.store
            .product(product_id)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Record a movement after checking every line against its product
    pub fn record_movement(&self, input: RecordMovementInput) -> AppResult<Movement> {
        input.validate()?;

        let movement = Movement {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            date: input.date.unwrap_or_else(Utc::now),
            kind: input.kind,
            warehouse_scope: WarehouseScope::new(input.warehouse_scope),
            context: input.context,
            mode: input.mode,
            reason: input.reason,
            lines: input.lines,
        };
        validate_movement(&movement).map_err(|msg| AppError::ValidationError(msg.to_string()))?;

        for line in &movement.lines {
            let product = self.get_product(line.product_id)?;
            if product.warehouse_scope != movement.warehouse_scope {
                return Err(AppError::Validation {
                    field: "lines".to_string(),
                    message: format!(
                        "Product {} belongs to scope '{}', not '{}'",
                        product.id, product.warehouse_scope, movement.warehouse_scope
                    ),
                });
            }
        }

        tracing::info!(
            movement_id = %movement.id,
            context = %movement.context,
            lines = movement.lines.len(),
            "Recording movement"
        );
        self.store.insert_movement(movement)
    }

    /// Delete a movement; the next reconcile recomputes from scratch
    pub fn delete_movement(&self, movement_id: Uuid) -> AppResult<Movement> {
        let movement = self.store.delete_movement(movement_id)?;
        tracing::info!(movement_id = %movement.id, "Deleted movement");
        Ok(movement)
    }

    /// Replace a product's baseline with counted quantities
    pub fn record_stocktake(&self, product_id: Uuid, input: StocktakeInput) -> AppResult<Product> {
        validate_stocktake_counts(&input.counts).map_err(|msg| AppError::Validation {
            field: "counts".to_string(),
            message: msg.to_string(),
        })?;

        let product = self.store.record_stocktake(
            product_id,
            PoolBalances::from_values(input.counts),
            input.at.unwrap_or_else(Utc::now),
        )?;
        tracing::info!(product_id = %product.id, "Recorded stocktake");
        Ok(product)
    }
}
