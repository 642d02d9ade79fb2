//! WebAssembly module for the stock ledger
//!
//! Provides client-side computation for:
//! - Per-product reconciliation over a report window
//! - Movement classification preview at entry time

use chrono::{DateTime, Utc};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;

use shared::{ClassificationRules, KeywordConfig, LedgerAggregator, TaxonomyPreset};

fn js_error(context: &str, err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&format!("{}: {}", context, err))
}

fn rules_for(preset: &str) -> Result<ClassificationRules, JsValue> {
    let preset: TaxonomyPreset = preset.parse().map_err(|e| js_error("Invalid preset", e))?;
    Ok(ClassificationRules::new(preset.build(), KeywordConfig::default()))
}

fn instant(millis: f64) -> Result<DateTime<Utc>, JsValue> {
    if !millis.is_finite() {
        return Err(JsValue::from_str("Timestamp must be finite"));
    }
    DateTime::from_timestamp_millis(millis as i64)
        .ok_or_else(|| JsValue::from_str("Timestamp out of range"))
}

fn window(start_ms: Option<f64>, end_ms: Option<f64>) -> Result<ReportWindow, JsValue> {
    let end = instant(end_ms.unwrap_or_else(js_sys::Date::now))?;
    match start_ms {
        Some(start) => {
            ReportWindow::range(instant(start)?, end).map_err(|e| js_error("Invalid window", e))
        }
        None => Ok(ReportWindow::snapshot(end)),
    }
}

/// Reconcile one product against its movements
///
/// Timestamps are JavaScript epoch milliseconds. Without `end_ms` the
/// window closes at the current instant. Returns the balance row as JSON.
#[wasm_bindgen]
pub fn reconcile_product(
    product_json: &str,
    movements_json: &str,
    start_ms: Option<f64>,
    end_ms: Option<f64>,
    preset: &str,
) -> Result<String, JsValue> {
    let product: Product =
        serde_json::from_str(product_json).map_err(|e| js_error("Invalid product JSON", e))?;
    let movements: Vec<Movement> = serde_json::from_str(movements_json)
        .map_err(|e| js_error("Invalid movements JSON", e))?;

    let aggregator = LedgerAggregator::new(rules_for(preset)?);
    let row = aggregator
        .reconcile(&product, &movements, &window(start_ms, end_ms)?)
        .map_err(|e| js_error("Reconciliation failed", e))?;

    #[cfg(target_arch = "wasm32")]
    for imbalance in &row.transfer_imbalances {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "Transfer group '{}' does not net to zero: {}",
            imbalance.transfer_group, imbalance.net
        )));
    }

    serde_json::to_string(&row).map_err(|e| js_error("Serialization failed", e))
}

/// Category key a movement's line for `product_id` would be booked under
#[wasm_bindgen]
pub fn classify_line(
    movement_json: &str,
    product_id: &str,
    preset: &str,
) -> Result<String, JsValue> {
    let movement: Movement =
        serde_json::from_str(movement_json).map_err(|e| js_error("Invalid movement JSON", e))?;
    let product_id = Uuid::parse_str(product_id).map_err(|e| js_error("Invalid product id", e))?;

    if !movement.references(product_id) {
        return Err(JsValue::from_str("Movement has no line for this product"));
    }

    Ok(rules_for(preset)?.classify(&movement).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PRODUCT: &str = "5f0c6a8e-2b1d-4c3a-9e7f-1a2b3c4d5e6f";

    fn product_json(opening: &[&str]) -> String {
        json!({
            "id": PRODUCT,
            "name": "Flour",
            "unit": "kg",
            "warehouse_scope": "raw",
            "opening": opening,
        })
        .to_string()
    }

    fn movement(context: &str, kind: &str, date: &str, qty: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "date": date,
            "kind": kind,
            "warehouse_scope": "raw",
            "context": context,
            "lines": [{ "product_id": PRODUCT, "quantity": qty, "unit": "kg" }],
        })
    }

    // 2024-04-01T00:00:00Z
    const END_MS: f64 = 1_711_929_600_000.0;

    #[test]
    fn test_reconcile_two_pool() {
        let movements = json!([movement("warehouse-issue", "out", "2024-03-10T09:00:00Z", "40")]);
        let result = reconcile_product(
            &product_json(&["200", "0"]),
            &movements.to_string(),
            None,
            Some(END_MS),
            "two_pool",
        )
        .unwrap();

        let row: BalanceRow = serde_json::from_str(&result).unwrap();
        assert_eq!(row.closing_a(), rust_decimal::Decimal::from(160));
        assert_eq!(row.closing_b(), rust_decimal::Decimal::from(40));
    }

    #[test]
    fn test_reconcile_ignores_movements_after_end() {
        let movements = json!([movement("incoming-purchase", "in", "2024-05-01T09:00:00Z", "10")]);
        let result = reconcile_product(
            &product_json(&["5"]),
            &movements.to_string(),
            None,
            Some(END_MS),
            "single_pool",
        )
        .unwrap();

        let row: BalanceRow = serde_json::from_str(&result).unwrap();
        assert_eq!(row.total_closing, rust_decimal::Decimal::from(5));
    }

    #[test]
    fn test_classify_line() {
        let issue = movement("warehouse-issue", "out", "2024-03-10T09:00:00Z", "1").to_string();
        assert_eq!(classify_line(&issue, PRODUCT, "two_pool").unwrap(), "warehouse-issue");

        let sale = movement("mystery", "out", "2024-03-10T09:00:00Z", "1").to_string();
        assert_eq!(classify_line(&sale, PRODUCT, "single_pool").unwrap(), "generic-outbound");
    }
}
