//! Ledger reconciliation
//!
//! Balances are never stored: every call folds the full movement history
//! for one product. Movements dated before the window move the opening
//! balance, movements inside the window are itemised by category, and
//! movements after the window end are ignored. Movements dated at or
//! before the product's last stocktake are already part of its baseline.
//!
//! Scope and quantity checks apply to movements up to the window end only,
//! so a bad movement entered later cannot fail a report for an earlier date.
//! Sums use checked arithmetic and fail with `QuantityOverflow`.

use rust_decimal::Decimal;

use crate::calculator::PoolBalanceCalculator;
use crate::classification::ClassificationRules;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{BalanceRow, CategoryTotals, Movement, Product, ReportRow, RowOutcome};
use crate::store::MovementStore;
use crate::taxonomy::Taxonomy;
use crate::types::{checked_add, PoolBalances, ReportWindow};

/// Signed pool deltas and itemised totals for one bucket of movements
struct Bucket {
    deltas: PoolBalances,
    categories: CategoryTotals,
    movements: usize,
}

impl Bucket {
    fn new(pool_count: usize) -> Self {
        Self {
            deltas: PoolBalances::zeroed(pool_count),
            categories: CategoryTotals::default(),
            movements: 0,
        }
    }

    fn book(&mut self, taxonomy: &Taxonomy, key: &str, quantity: Decimal) -> LedgerResult<()> {
        let category = taxonomy.category(key)?;
        for (pool, delta) in category.signed_legs(quantity) {
            self.deltas[pool] = checked_add(self.deltas[pool], delta, key)?;
        }
        self.categories.add(key, quantity)
    }
}

/// Reconciles products against their movement history
#[derive(Debug, Clone)]
pub struct LedgerAggregator {
    rules: ClassificationRules,
}

impl LedgerAggregator {
    pub fn new(rules: ClassificationRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ClassificationRules {
        &self.rules
    }

    /// Reconcile one product over a report window
    ///
    /// `movements` must already be limited to the product's warehouse scope;
    /// a movement from another scope dated up to the window end fails the
    /// call. Input order does not matter.
    pub fn reconcile(
        &self,
        product: &Product,
        movements: &[Movement],
        window: &ReportWindow,
    ) -> LedgerResult<BalanceRow> {
        let taxonomy = self.rules.taxonomy();
        let pool_count = taxonomy.pool_count();
        let stored_opening = product.opening.padded(pool_count)?;

        let mut ordered: Vec<&Movement> = movements.iter().collect();
        ordered.sort_by_key(|movement| movement.date);

        let mut pre = Bucket::new(pool_count);
        let mut current = Bucket::new(pool_count);
        let mut superseded = 0usize;

        for movement in ordered {
            if window.is_future(movement.date) {
                continue;
            }
            check_movement(product, movement)?;
            if product
                .last_stocktake_at
                .is_some_and(|counted_at| movement.date <= counted_at)
            {
                superseded += 1;
                continue;
            }
            if !movement.references(product.id) {
                tracing::debug!(
                    movement_id = %movement.id,
                    product_id = %product.id,
                    "Skipping movement without lines for product"
                );
                continue;
            }

            let bucket = if window.precedes(movement.date) {
                &mut pre
            } else {
                &mut current
            };
            let key = self.rules.classify(movement);
            for line in movement.lines_for(product.id) {
                bucket.book(taxonomy, key, line.quantity)?;
            }
            bucket.movements += 1;
        }

        let opening = PoolBalanceCalculator::compute_closing(&stored_opening, &pre.deltas)?;
        let closing = PoolBalanceCalculator::compute_closing(&opening, &current.deltas)?;

        let transfer_imbalances =
            PoolBalanceCalculator::check_transfers(taxonomy, &current.categories)?;
        for imbalance in &transfer_imbalances {
            tracing::warn!(
                product_id = %product.id,
                transfer_group = %imbalance.transfer_group,
                net = %imbalance.net,
                "Transfer legs do not net to zero"
            );
        }

        tracing::debug!(
            product_id = %product.id,
            taxonomy = taxonomy.name(),
            pre_window = pre.movements,
            in_window = current.movements,
            superseded,
            "Reconciled product"
        );

        Ok(BalanceRow {
            product_id: product.id,
            total_opening: opening.total()?,
            total_closing: closing.total()?,
            opening,
            closing,
            category_totals: current.categories,
            pre_window_movements: pre.movements,
            window_movements: current.movements,
            transfer_imbalances,
        })
    }

    /// Reconcile many products, one row each
    ///
    /// A product that fails becomes an unreconcilable row; the batch itself
    /// never aborts.
    pub fn reconcile_all<S: MovementStore + ?Sized>(
        &self,
        products: &[Product],
        store: &S,
        window: &ReportWindow,
    ) -> Vec<ReportRow> {
        products
            .iter()
            .map(|product| {
                let movements = store.movements_for(product.id, &product.warehouse_scope);
                let outcome = match self.reconcile(product, &movements, window) {
                    Ok(row) => RowOutcome::Reconciled(row),
                    Err(err) => {
                        tracing::warn!(
                            product_id = %product.id,
                            error = %err,
                            "Product is unreconcilable"
                        );
                        RowOutcome::Unreconcilable {
                            reason: err.to_string(),
                        }
                    }
                };
                ReportRow {
                    product_id: product.id,
                    outcome,
                }
            })
            .collect()
    }
}

fn check_movement(product: &Product, movement: &Movement) -> LedgerResult<()> {
    if movement.warehouse_scope != product.warehouse_scope {
        return Err(LedgerError::UnscopedMovement {
            movement_id: movement.id,
            expected: product.warehouse_scope.to_string(),
            found: movement.warehouse_scope.to_string(),
        });
    }
    if let Some(line) = movement
        .lines_for(product.id)
        .find(|line| line.quantity < Decimal::ZERO)
    {
        return Err(LedgerError::InvalidQuantity {
            movement_id: Some(movement.id),
            quantity: line.quantity.to_string(),
        });
    }
    Ok(())
}
