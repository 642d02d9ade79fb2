//! Domain models for the stock ledger

mod balance;
mod movement;
mod product;

pub use balance::*;
pub use movement::*;
pub use product::*;
