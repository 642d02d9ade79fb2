//! HTTP handlers for stock ledger reports

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use shared::{BalanceRow, ReportRow, ReportWindow, TaxonomyDef, WarehouseScope};
use uuid::Uuid;

use crate::error::AppResult;
use crate::AppState;

/// Report window as calendar days; both bounds inclusive
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl WindowQuery {
    /// Without an end date the window runs to the current instant
    pub fn into_window(self) -> AppResult<ReportWindow> {
        let window = match (self.start, self.end) {
            (start, Some(end)) => ReportWindow::from_dates(start, end)?,
            (None, None) => ReportWindow::as_of_now(),
            (Some(start), None) => {
                ReportWindow::range(start.and_time(NaiveTime::MIN).and_utc(), Utc::now())?
            }
        };
        Ok(window)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub scope: String,
    #[serde(flatten)]
    pub window: WindowQuery,
}

/// Reconcile one product
///
/// Only requests with an explicit end date go through the cache.
pub async fn get_product_balance(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<BalanceRow>> {
    let pinned = query.end.is_some();
    let window = query.into_window()?;
    let row = if pinned {
        state.ledger.reconcile_product(product_id, window)?
    } else {
        state.ledger.reconcile_live(product_id, window)?
    };
    Ok(Json(row))
}

/// Reconcile every product in a warehouse scope
pub async fn get_scope_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<Vec<ReportRow>>> {
    let scope = WarehouseScope::new(query.scope);
    let rows = state.ledger.report(&scope, query.window.into_window()?);
    Ok(Json(rows))
}

/// Taxonomy used for a scope, so report columns can be labelled
pub async fn get_taxonomy(
    State(state): State<AppState>,
    Path(scope): Path<String>,
) -> Json<TaxonomyDef> {
    let taxonomy = state.ledger.taxonomy_for(&WarehouseScope::new(scope));
    Json(TaxonomyDef::from(taxonomy.clone()))
}
