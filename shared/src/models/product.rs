//! Product reference models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::WarehouseScope;
use crate::error::{LedgerError, LedgerResult};
use crate::types::{PoolBalances, PoolId};

/// A stocked product with the baseline balances of its last stocktake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub unit: String,
    pub warehouse_scope: WarehouseScope,
    /// Baseline per pool, indexed by [`PoolId`]
    pub opening: PoolBalances,
    pub last_stocktake_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn opening_a(&self) -> Decimal {
        self.opening.get(PoolId::PRIMARY)
    }

    pub fn opening_b(&self) -> Decimal {
        self.opening.get(PoolId::SECONDARY)
    }

    /// Replace the baseline balances with counted quantities
    pub fn record_stocktake(
        &mut self,
        counted: PoolBalances,
        at: DateTime<Utc>,
    ) -> LedgerResult<()> {
        if counted.pool_count() != self.opening.pool_count() {
            return Err(LedgerError::PoolCountMismatch {
                expected: self.opening.pool_count(),
                found: counted.pool_count(),
            });
        }
        if let Some(negative) = counted.values().iter().find(|v| **v < Decimal::ZERO) {
            return Err(LedgerError::InvalidQuantity {
                movement_id: None,
                quantity: negative.to_string(),
            });
        }
        self.opening = counted;
        self.last_stocktake_at = Some(at);
        Ok(())
    }
}
