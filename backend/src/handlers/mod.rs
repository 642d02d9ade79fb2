//! HTTP handlers for the stock ledger API

mod health;
mod inventory;
mod ledger;

pub use health::*;
pub use inventory::*;
pub use ledger::*;
