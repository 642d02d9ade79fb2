//! Business logic services for the stock ledger

pub mod inventory;
pub mod ledger;

pub use inventory::InventoryService;
pub use ledger::LedgerService;
