//! In-memory movement and product store
//!
//! Persistence is outside the engine; this store gives the service an
//! ordered read of movements per product and a version counter that moves
//! on every write so cached reconciliations can be keyed on it.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared::{Movement, MovementStore, PoolBalances, Product, ProductStore, WarehouseScope};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    products: DashMap<Uuid, Product>,
    movements: DashMap<Uuid, Movement>,
    version: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incremented on every insert, delete and stocktake
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::AcqRel);
    }

    pub fn insert_product(&self, product: Product) -> AppResult<Product> {
        match self.products.entry(product.id) {
            Entry::Occupied(_) => Err(AppError::DuplicateEntry("Product".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(product.clone());
                self.bump();
                Ok(product)
            }
        }
    }

    /// Replace a product's opening balances with counted quantities
    pub fn record_stocktake(
        &self,
        product_id: Uuid,
        counted: PoolBalances,
        at: DateTime<Utc>,
    ) -> AppResult<Product> {
        let mut product = self
            .products
            .get_mut(&product_id)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        product.record_stocktake(counted, at)?;
        let updated = product.clone();
        drop(product);
        self.bump();
        Ok(updated)
    }

    pub fn insert_movement(&self, movement: Movement) -> AppResult<Movement> {
        match self.movements.entry(movement.id) {
            Entry::Occupied(_) => Err(AppError::DuplicateEntry("Movement".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(movement.clone());
                self.bump();
                Ok(movement)
            }
        }
    }

    /// Remove a movement; balances shown before must be recomputed
    pub fn delete_movement(&self, movement_id: Uuid) -> AppResult<Movement> {
        let (_, movement) = self
            .movements
            .remove(&movement_id)
            .ok_or_else(|| AppError::NotFound("Movement".to_string()))?;
        self.bump();
        Ok(movement)
    }
}

impl MovementStore for InMemoryStore {
    fn movements_for(&self, product_id: Uuid, scope: &WarehouseScope) -> Vec<Movement> {
        let mut movements: Vec<Movement> = self
            .movements
            .iter()
            .filter(|entry| &entry.warehouse_scope == scope && entry.references(product_id))
            .map(|entry| entry.value().clone())
            .collect();
        movements.sort_by_key(|movement| (movement.date, movement.id));
        movements
    }
}

impl ProductStore for InMemoryStore {
    fn product(&self, id: Uuid) -> Option<Product> {
        self.products.get(&id).map(|entry| entry.value().clone())
    }

    fn products_in_scope(&self, scope: &WarehouseScope) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .filter(|entry| &entry.warehouse_scope == scope)
            .map(|entry| entry.value().clone())
            .collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        products
    }
}
