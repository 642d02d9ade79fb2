//! Stock ledger service
//!
//! Wraps the reconciliation engine behind an HTTP API with an in-memory
//! movement store.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use error::AppResult;
use services::LedgerService;
use store::InMemoryStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<InMemoryStore>,
    pub ledger: Arc<LedgerService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build state with an empty store
    pub fn new(config: Config) -> AppResult<Self> {
        let store = Arc::new(InMemoryStore::new());
        let ledger = LedgerService::from_config(store.clone(), &config.ledger)?;
        Ok(Self {
            store,
            ledger: Arc::new(ledger),
            config: Arc::new(config),
        })
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Stock Ledger API v1.0"
}
