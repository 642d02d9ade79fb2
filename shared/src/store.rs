//! Read interfaces the engine needs from persistence

use uuid::Uuid;

use crate::models::{Movement, Product, WarehouseScope};

/// Source of movement records
pub trait MovementStore {
    /// Movements in `scope` with at least one line for `product_id`, in any order
    fn movements_for(&self, product_id: Uuid, scope: &WarehouseScope) -> Vec<Movement>;
}

/// Source of product baselines
pub trait ProductStore {
    fn product(&self, id: Uuid) -> Option<Product>;

    fn products_in_scope(&self, scope: &WarehouseScope) -> Vec<Product>;
}

/// A plain slice of movements, filtered on read
impl MovementStore for [Movement] {
    fn movements_for(&self, product_id: Uuid, scope: &WarehouseScope) -> Vec<Movement> {
        self.iter()
            .filter(|movement| {
                &movement.warehouse_scope == scope && movement.references(product_id)
            })
            .cloned()
            .collect()
    }
}
