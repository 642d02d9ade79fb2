//! Computed balance models
//!
//! Everything here is derived fresh on every report and never persisted.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LedgerResult;
use crate::types::{checked_add, PoolBalances, PoolId};

/// Summed quantity per category key for one product and window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTotals(BTreeMap<String, Decimal>);

impl CategoryTotals {
    pub fn add(&mut self, category: &str, quantity: Decimal) -> LedgerResult<()> {
        let total = self.0.entry(category.to_string()).or_insert(Decimal::ZERO);
        *total = checked_add(*total, quantity, category)?;
        Ok(())
    }

    /// Total for a category, zero when it never occurred
    pub fn get(&self, category: &str) -> Decimal {
        self.0.get(category).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(key, value)| (key.as_str(), *value))
    }

    /// Sum of all category magnitudes
    pub fn grand_total(&self) -> LedgerResult<Decimal> {
        self.0
            .values()
            .try_fold(Decimal::ZERO, |sum, value| checked_add(sum, *value, "category totals"))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Transfer group whose signed legs did not net to zero
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferImbalance {
    pub transfer_group: String,
    /// Signed sum across all pools; positive means stock appeared
    pub net: Decimal,
}

/// Reconciled balances for one product over one report window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub product_id: Uuid,
    pub opening: PoolBalances,
    pub closing: PoolBalances,
    pub total_opening: Decimal,
    pub total_closing: Decimal,
    pub category_totals: CategoryTotals,
    pub pre_window_movements: usize,
    pub window_movements: usize,
    pub transfer_imbalances: Vec<TransferImbalance>,
}

impl BalanceRow {
    pub fn opening_a(&self) -> Decimal {
        self.opening.get(PoolId::PRIMARY)
    }

    pub fn opening_b(&self) -> Decimal {
        self.opening.get(PoolId::SECONDARY)
    }

    pub fn closing_a(&self) -> Decimal {
        self.closing.get(PoolId::PRIMARY)
    }

    pub fn closing_b(&self) -> Decimal {
        self.closing.get(PoolId::SECONDARY)
    }
}

/// One row of a multi-product report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub product_id: Uuid,
    pub outcome: RowOutcome,
}

/// Result of reconciling one product within a batch
///
/// A failed product renders as an explicit unreconcilable marker, never as zero stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RowOutcome {
    Reconciled(BalanceRow),
    Unreconcilable { reason: String },
}

impl ReportRow {
    pub fn balance(&self) -> Option<&BalanceRow> {
        match &self.outcome {
            RowOutcome::Reconciled(row) => Some(row),
            RowOutcome::Unreconcilable { .. } => None,
        }
    }
}
