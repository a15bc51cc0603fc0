//! Application configuration for the inventory pipeline.
//!
//! User config lives at `~/.siteinventory/siteinventory.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InventoryError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "siteinventory.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".siteinventory";

// ---------------------------------------------------------------------------
// Config structs (matching siteinventory.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Run limits.
    #[serde(default)]
    pub inventory: InventoryDefaults,

    /// Per-call timeouts for external collaborators.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// OpenRouter settings for semantic classification.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Fallback site-search settings.
    #[serde(default)]
    pub search: SearchConfig,
}

/// `[inventory]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryDefaults {
    /// Maximum URLs collected from sitemaps.
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// Maximum pages fetched in full for quality assessment.
    #[serde(default = "default_max_deep_read")]
    pub max_deep_read: usize,

    /// Skip the deep-read stage entirely.
    #[serde(default)]
    pub skip_deep_read: bool,
}

impl Default for InventoryDefaults {
    fn default() -> Self {
        Self {
            max_urls: default_max_urls(),
            max_deep_read: default_max_deep_read(),
            skip_deep_read: false,
        }
    }
}

fn default_max_urls() -> usize {
    500
}
fn default_max_deep_read() -> usize {
    15
}

/// `[timeouts]` section, all values in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_sitemap_secs")]
    pub sitemap_secs: u64,
    #[serde(default = "default_classify_secs")]
    pub classify_secs: u64,
    #[serde(default = "default_fetch_secs")]
    pub fetch_secs: u64,
    #[serde(default = "default_search_secs")]
    pub search_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            sitemap_secs: default_sitemap_secs(),
            classify_secs: default_classify_secs(),
            fetch_secs: default_fetch_secs(),
            search_secs: default_search_secs(),
        }
    }
}

fn default_sitemap_secs() -> u64 {
    10
}
fn default_classify_secs() -> u64 {
    60
}
fn default_fetch_secs() -> u64 {
    30
}
fn default_search_secs() -> u64 {
    30
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for URL classification.
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// URL template for the fallback site search; `{query}` is replaced by
    /// the URL-encoded `site:<domain>` query.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/?q={query}".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.siteinventory/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| InventoryError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.siteinventory/siteinventory.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| InventoryError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        InventoryError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| InventoryError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| InventoryError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| InventoryError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values that would make every external call fail immediately.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    let t = &config.timeouts;
    if t.sitemap_secs == 0 || t.classify_secs == 0 || t.fetch_secs == 0 || t.search_secs == 0 {
        return Err(InventoryError::config("timeouts must be at least 1 second"));
    }
    if !config.search.endpoint.contains("{query}") {
        return Err(InventoryError::config(
            "search.endpoint must contain a {query} placeholder",
        ));
    }
    Ok(())
}

/// Read the OpenRouter API key from the configured env var, if set and non-empty.
pub fn openrouter_api_key(config: &AppConfig) -> Option<String> {
    std::env::var(&config.openrouter.api_key_env)
        .ok()
        .filter(|val| !val.trim().is_empty())
}
