//! Common types used across the ledger engine

use std::fmt;
use std::ops::{Index, IndexMut};

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Index of a storage pool within a product's balance vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub u8);

impl PoolId {
    /// Pool A: the primary warehouse floor
    pub const PRIMARY: PoolId = PoolId(0);
    /// Pool B: the secondary silo
    pub const SECONDARY: PoolId = PoolId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

/// Direction of a category leg within its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Credit,
    Debit,
}

impl Sign {
    /// Apply this sign to a non-negative magnitude
    pub fn apply(self, magnitude: Decimal) -> Decimal {
        match self {
            Sign::Credit => magnitude,
            Sign::Debit => -magnitude,
        }
    }
}

/// Per-pool quantities, indexed by [`PoolId`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolBalances(Vec<Decimal>);

impl PoolBalances {
    /// All-zero balances for `pool_count` pools
    pub fn zeroed(pool_count: usize) -> Self {
        Self(vec![Decimal::ZERO; pool_count])
    }

    pub fn from_values(values: Vec<Decimal>) -> Self {
        Self(values)
    }

    /// Warehouse + silo balances
    pub fn two(a: Decimal, b: Decimal) -> Self {
        Self(vec![a, b])
    }

    /// Single-pool balance
    pub fn single(a: Decimal) -> Self {
        Self(vec![a])
    }

    pub fn pool_count(&self) -> usize {
        self.0.len()
    }

    /// Balance of a pool; pools beyond the vector read as zero
    pub fn get(&self, pool: PoolId) -> Decimal {
        self.0.get(pool.index()).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn values(&self) -> &[Decimal] {
        &self.0
    }

    /// Sum across pools
    pub fn total(&self) -> LedgerResult<Decimal> {
        self.0
            .iter()
            .try_fold(Decimal::ZERO, |sum, value| checked_add(sum, *value, "pool total"))
    }

    /// Resize to `pool_count` pools, padding with zero
    pub fn padded(&self, pool_count: usize) -> LedgerResult<Self> {
        if self.0.len() > pool_count {
            return Err(LedgerError::PoolCountMismatch {
                expected: pool_count,
                found: self.0.len(),
            });
        }
        let mut values = self.0.clone();
        values.resize(pool_count, Decimal::ZERO);
        Ok(Self(values))
    }
}

impl Index<PoolId> for PoolBalances {
    type Output = Decimal;

    fn index(&self, pool: PoolId) -> &Decimal {
        &self.0[pool.index()]
    }
}

impl IndexMut<PoolId> for PoolBalances {
    fn index_mut(&mut self, pool: PoolId) -> &mut Decimal {
        &mut self.0[pool.index()]
    }
}

/// `a + b`, failing instead of panicking when the result leaves `Decimal` range
pub fn checked_add(a: Decimal, b: Decimal, context: &str) -> LedgerResult<Decimal> {
    a.checked_add(b).ok_or_else(|| LedgerError::QuantityOverflow {
        context: context.to_string(),
    })
}

/// Quantity helpers for values entering the engine
pub struct Quantity;

impl Quantity {
    /// Convert a float from an untyped boundary (JSON from the browser)
    pub fn from_f64(value: f64) -> LedgerResult<Decimal> {
        if !value.is_finite() {
            return Err(LedgerError::InvalidQuantity {
                movement_id: None,
                quantity: value.to_string(),
            });
        }
        Decimal::try_from(value).map_err(|_| LedgerError::InvalidQuantity {
            movement_id: None,
            quantity: value.to_string(),
        })
    }
}

/// The `[start, end]` range a report covers
///
/// `start = None` is snapshot mode: every movement up to `end` is in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    /// Everything up to and including `end`
    pub fn snapshot(end: DateTime<Utc>) -> Self {
        Self { start: None, end }
    }

    /// Snapshot as of the current instant
    pub fn as_of_now() -> Self {
        Self::snapshot(Utc::now())
    }

    pub fn range(start: DateTime<Utc>, end: DateTime<Utc>) -> LedgerResult<Self> {
        if start > end {
            return Err(LedgerError::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self {
            start: Some(start),
            end,
        })
    }

    /// Whole-day window: `start` at midnight through the last instant of `end`
    pub fn from_dates(start: Option<NaiveDate>, end: NaiveDate) -> LedgerResult<Self> {
        let end_instant = end
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::MIN).and_utc() - TimeDelta::nanoseconds(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        match start {
            Some(start) => Self::range(start.and_time(NaiveTime::MIN).and_utc(), end_instant),
            None => Ok(Self::snapshot(end_instant)),
        }
    }

    /// Movement dated before the window start
    pub fn precedes(&self, date: DateTime<Utc>) -> bool {
        self.start.is_some_and(|start| date < start)
    }

    /// Movement dated after the window end
    pub fn is_future(&self, date: DateTime<Utc>) -> bool {
        date > self.end
    }
}
