//! Configuration management for the stock ledger service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with STOCK_LEDGER_ prefix

use std::collections::HashMap;

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{KeywordConfig, TaxonomyPreset};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Reconciliation engine configuration
    pub ledger: LedgerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Built-in taxonomy per warehouse scope
    #[serde(default)]
    pub scope_presets: HashMap<String, TaxonomyPreset>,

    /// Preset for scopes not listed in `scope_presets`
    pub default_preset: TaxonomyPreset,

    /// JSON taxonomy files per scope, overriding presets
    #[serde(default)]
    pub taxonomy_files: HashMap<String, String>,

    /// Reason keywords used for classification
    #[serde(default)]
    pub keywords: KeywordConfig,

    /// Cache reconciled rows keyed on store version
    pub cache_enabled: bool,

    /// Most rows held before the cache is cleared
    pub cache_capacity: usize,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("STOCK_LEDGER_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("ledger.default_preset", "single_pool")?
            .set_default("ledger.scope_presets.raw", "two_pool")?
            .set_default("ledger.cache_enabled", true)?
            .set_default("ledger.cache_capacity", 1024)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (STOCK_LEDGER_ prefix)
            .add_source(
                Environment::with_prefix("STOCK_LEDGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            scope_presets: HashMap::from([("raw".to_string(), TaxonomyPreset::TwoPool)]),
            default_preset: TaxonomyPreset::SinglePool,
            taxonomy_files: HashMap::new(),
            keywords: KeywordConfig::default(),
            cache_enabled: true,
            cache_capacity: 1024,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }
}
