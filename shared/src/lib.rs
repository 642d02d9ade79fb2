//! Stock ledger reconciliation engine
//!
//! Rebuilds opening and closing quantities per storage pool from an
//! append-only movement log. This crate is pure computation shared by the
//! backend service and the browser (via WASM).

pub mod aggregator;
pub mod calculator;
pub mod classification;
pub mod error;
pub mod models;
pub mod store;
pub mod taxonomy;
pub mod types;
pub mod validation;

pub use aggregator::*;
pub use calculator::*;
pub use classification::*;
pub use error::*;
pub use models::*;
pub use store::*;
pub use taxonomy::{ContextRule, KeywordSet, Taxonomy, TaxonomyDef, TaxonomyPreset};
pub use types::*;
pub use validation::*;
