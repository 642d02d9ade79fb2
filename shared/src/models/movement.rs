//! Stock movement models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A recorded stock event, immutable once persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub kind: MovementKind,
    pub warehouse_scope: WarehouseScope,
    /// Entry-time tag, the primary classification signal
    pub context: String,
    #[serde(default)]
    pub mode: MovementMode,
    #[serde(default)]
    pub reason: String,
    pub lines: Vec<MovementLine>,
}

impl Movement {
    /// Lines of this movement that reference `product_id`
    pub fn lines_for(&self, product_id: Uuid) -> impl Iterator<Item = &MovementLine> {
        self.lines.iter().filter(move |line| line.product_id == product_id)
    }

    pub fn references(&self, product_id: Uuid) -> bool {
        self.lines.iter().any(|line| line.product_id == product_id)
    }
}

/// Movement kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    In,
    Out,
    Adjustment,
    Return,
    Transfer,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::In => "in",
            MovementKind::Out => "out",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Return => "return",
            MovementKind::Transfer => "transfer",
        }
    }
}

/// Direction qualifier used by transfer-like contexts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementMode {
    #[serde(rename = "in")]
    In,
    #[serde(rename = "out")]
    Out,
    #[default]
    #[serde(rename = "")]
    Unset,
}

/// Logical warehouse/domain a movement or product belongs to
/// (e.g. "raw", "parts", "finished", "catering")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseScope(pub String);

impl WarehouseScope {
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WarehouseScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One item line of a movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementLine {
    pub product_id: Uuid,
    /// Non-negative magnitude; direction comes from the category
    pub quantity: Decimal,
    pub unit: String,
}
