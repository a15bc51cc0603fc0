//! Shared types, error model, and configuration for the site inventory pipeline.
//!
//! This crate is the foundation depended on by all other siteinventory crates.
//! It provides:
//! - [`InventoryError`]: the unified error type
//! - Domain types ([`SitemapUrl`], [`SitePageEntry`], [`RunStatistics`], [`Inventory`])
//! - Domain/path normalization ([`origin_for`], [`normalize_path`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;
pub mod urls;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, InventoryDefaults, OpenRouterConfig, SearchConfig, TimeoutsConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, openrouter_api_key,
    validate_config,
};
pub use error::{InventoryError, Result};
pub use types::{
    ContentQuality, ContentType, DiscoverySource, Inventory, MAX_TOPICS, RunStatistics,
    SUBSTANTIVE_WORD_THRESHOLD, SitePageEntry, SitemapUrl,
};
pub use urls::{absolute_url, host_for, normalize_path, origin_for};
