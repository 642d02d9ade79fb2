//! Validation utilities for movement and stocktake entry
//!
//! These run at the entry boundary (HTTP, browser forms). The aggregator
//! re-checks quantities itself and fails the reconciliation on bad data.

use rust_decimal::Decimal;

use crate::models::Movement;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Line quantities are magnitudes; direction comes from the category
pub fn validate_line_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity < Decimal::ZERO {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

/// Stocktake counts replace the baseline and cannot be negative
pub fn validate_stocktake_counts(counts: &[Decimal]) -> Result<(), &'static str> {
    if counts.is_empty() {
        return Err("Stocktake must count at least one pool");
    }
    if counts.iter().any(|c| *c < Decimal::ZERO) {
        return Err("Stocktake counts cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Tag Validations
// ============================================================================

/// Context tags and scopes are lowercase kebab-case (e.g. "silo-transfer")
pub fn validate_tag(tag: &str) -> Result<(), &'static str> {
    if tag.is_empty() {
        return Err("Tag cannot be empty");
    }
    if tag.len() > 64 {
        return Err("Tag must be at most 64 characters");
    }
    if tag.starts_with('-') || tag.ends_with('-') {
        return Err("Tag cannot start or end with a hyphen");
    }
    if !tag
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Tag must be lowercase letters, digits and hyphens");
    }
    Ok(())
}

/// Units are short free-form labels such as "kg" or "pcs"
pub fn validate_unit(unit: &str) -> Result<(), &'static str> {
    let trimmed = unit.trim();
    if trimmed.is_empty() {
        return Err("Unit cannot be empty");
    }
    if trimmed.len() > 16 {
        return Err("Unit must be at most 16 characters");
    }
    Ok(())
}

// ============================================================================
// Movement Validations
// ============================================================================

/// Structural checks on a movement before it is stored
pub fn validate_movement(movement: &Movement) -> Result<(), &'static str> {
    if movement.lines.is_empty() {
        return Err("Movement must have at least one line");
    }
    validate_tag(&movement.context)?;
    validate_tag(movement.warehouse_scope.as_str())?;
    for line in &movement.lines {
        validate_line_quantity(line.quantity)?;
        validate_unit(&line.unit)?;
    }
    Ok(())
}
