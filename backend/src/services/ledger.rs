//! Reconciliation service wrapping the ledger engine
//!
//! Holds one aggregator per warehouse scope and caches reconciled rows
//! keyed on `(product, store version, window)`. Any write to the store moves
//! the version, so a cached row is never served after a movement changes.
//! Only pinned windows are cached: a window ending "now" never repeats. The
//! cache is cleared once it holds `cache_capacity` rows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use shared::{
    BalanceRow, ClassificationRules, LedgerAggregator, MovementStore, ProductStore, ReportRow,
    ReportWindow, Taxonomy, WarehouseScope,
};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::error::{AppError, AppResult};
use crate::store::InMemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    product_id: Uuid,
    version: u64,
    window: ReportWindow,
}

/// Reconciliation service
pub struct LedgerService {
    store: Arc<InMemoryStore>,
    scoped: HashMap<String, LedgerAggregator>,
    default: LedgerAggregator,
    cache: Option<DashMap<CacheKey, BalanceRow>>,
    cache_capacity: usize,
    cached_version: AtomicU64,
}

impl LedgerService {
    /// Build aggregators for every configured scope
    pub fn from_config(store: Arc<InMemoryStore>, config: &LedgerConfig) -> AppResult<Self> {
        let build = |taxonomy: Taxonomy| {
            LedgerAggregator::new(ClassificationRules::new(taxonomy, config.keywords.clone()))
        };

        let mut scoped: HashMap<String, LedgerAggregator> = config
            .scope_presets
            .iter()
            .map(|(scope, preset)| (scope.clone(), build(preset.build())))
            .collect();

        for (scope, path) in &config.taxonomy_files {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                AppError::Configuration(format!("Cannot read taxonomy file {}: {}", path, e))
            })?;
            let taxonomy: Taxonomy = serde_json::from_str(&raw).map_err(|e| {
                AppError::Configuration(format!("Invalid taxonomy file {}: {}", path, e))
            })?;
            tracing::info!(scope = %scope, taxonomy = taxonomy.name(), "Loaded taxonomy file");
            scoped.insert(scope.clone(), build(taxonomy));
        }

        Ok(Self {
            store,
            scoped,
            default: build(config.default_preset.build()),
            cache: config.cache_enabled.then(DashMap::new),
            cache_capacity: config.cache_capacity.max(1),
            cached_version: AtomicU64::new(0),
        })
    }

    /// Aggregator responsible for a warehouse scope
    pub fn aggregator_for(&self, scope: &WarehouseScope) -> &LedgerAggregator {
        self.scoped.get(scope.as_str()).unwrap_or(&self.default)
    }

    pub fn taxonomy_for(&self, scope: &WarehouseScope) -> &Taxonomy {
        self.aggregator_for(scope).rules().taxonomy()
    }

    /// Rows currently cached
    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.len())
    }

    /// Reconcile one product over a window ending at the current instant
    ///
    /// Never cached, since the same window cannot be requested twice.
    pub fn reconcile_live(&self, product_id: Uuid, window: ReportWindow) -> AppResult<BalanceRow> {
        self.compute(product_id, &window)
    }

    /// Reconcile one product over a pinned window, served from cache when the
    /// store is unchanged
    pub fn reconcile_product(
        &self,
        product_id: Uuid,
        window: ReportWindow,
    ) -> AppResult<BalanceRow> {
        // Read the version before the data so a cached row is never older than its key
        let version = self.store.version();
        let key = CacheKey {
            product_id,
            version,
            window,
        };

        if let Some(cache) = &self.cache {
            if self.cached_version.swap(version, Ordering::AcqRel) != version {
                cache.clear();
            }
            if let Some(row) = cache.get(&key) {
                tracing::debug!(product_id = %product_id, version, "Reconciliation cache hit");
                return Ok(row.clone());
            }
        }

        let row = self.compute(product_id, &window)?;

        if let Some(cache) = &self.cache {
            if cache.len() >= self.cache_capacity {
                tracing::debug!(
                    capacity = self.cache_capacity,
                    "Reconciliation cache full, clearing"
                );
                cache.clear();
            }
            cache.insert(key, row.clone());
        }
        Ok(row)
    }

    fn compute(&self, product_id: Uuid, window: &ReportWindow) -> AppResult<BalanceRow> {
        let product = self
            .store
            .product(product_id)
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
        let movements = self
            .store
            .movements_for(product.id, &product.warehouse_scope);
        let row = self
            .aggregator_for(&product.warehouse_scope)
            .reconcile(&product, &movements, window)?;
        Ok(row)
    }

    /// Reconcile every product in a scope; failures become marked rows
    pub fn report(&self, scope: &WarehouseScope, window: ReportWindow) -> Vec<ReportRow> {
        let products = self.store.products_in_scope(scope);
        let rows = self
            .aggregator_for(scope)
            .reconcile_all(&products, self.store.as_ref(), &window);

        let failed = rows.iter().filter(|row| row.balance().is_none()).count();
        tracing::info!(
            scope = %scope,
            products = rows.len(),
            unreconcilable = failed,
            "Built stock report"
        );
        rows
    }
}
