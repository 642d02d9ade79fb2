//! Pool balance roll-up

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::error::{LedgerError, LedgerResult};
use crate::models::{CategoryTotals, TransferImbalance};
use crate::taxonomy::Taxonomy;
use crate::types::{checked_add, PoolBalances};

/// Combines opening balances and period deltas into closing balances
pub struct PoolBalanceCalculator;

impl PoolBalanceCalculator {
    /// `closing = opening + delta`, per pool
    pub fn compute_closing(
        opening: &PoolBalances,
        delta: &PoolBalances,
    ) -> LedgerResult<PoolBalances> {
        if opening.pool_count() != delta.pool_count() {
            return Err(LedgerError::PoolCountMismatch {
                expected: opening.pool_count(),
                found: delta.pool_count(),
            });
        }

        let closing = opening
            .values()
            .iter()
            .zip(delta.values())
            .map(|(opening, delta)| checked_add(*opening, *delta, "pool balance"))
            .collect::<LedgerResult<Vec<_>>>()?;
        Ok(PoolBalances::from_values(closing))
    }

    /// Transfer groups whose signed legs do not net to zero
    ///
    /// One-sided transfer data is legitimate during partial imports, so this
    /// reports rather than fails.
    pub fn check_transfers(
        taxonomy: &Taxonomy,
        totals: &CategoryTotals,
    ) -> LedgerResult<Vec<TransferImbalance>> {
        let mut groups: BTreeMap<&str, Decimal> = BTreeMap::new();

        for category in taxonomy.categories() {
            let Some(group) = category.transfer_group.as_deref() else {
                continue;
            };
            let net = category
                .signed_legs(totals.get(&category.key))
                .try_fold(Decimal::ZERO, |net, (_, delta)| checked_add(net, delta, group))?;
            let entry = groups.entry(group).or_insert(Decimal::ZERO);
            *entry = checked_add(*entry, net, group)?;
        }

        Ok(groups
            .into_iter()
            .filter(|(_, net)| !net.is_zero())
            .map(|(group, net)| TransferImbalance {
                transfer_group: group.to_string(),
                net,
            })
            .collect())
    }
}
