//! Application configuration for personlink.
//!
//! User config lives at `~/.personlink/personlink.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PersonLinkError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "personlink.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".personlink";

// ---------------------------------------------------------------------------
// Config structs (matching personlink.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Target site settings.
    #[serde(default)]
    pub site: SiteConfig,

    /// HTTP fetch behaviour.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Graph store location.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Candidate link filtering.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Biography page a run starts from when no URL is given.
    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// Number of hops to follow per run.
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            max_hops: default_max_hops(),
        }
    }
}

fn default_start_url() -> String {
    "https://en.wikipedia.org/wiki/Michael_Jordan".into()
}
fn default_max_hops() -> u32 {
    1
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Base URL relative paragraph links are resolved against.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

fn default_base_url() -> String {
    "https://en.wikipedia.org".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Minimum ms to wait before each request.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            rate_limit_ms: default_rate_limit(),
        }
    }
}

fn default_user_agent() -> String {
    concat!("personlink/", env!("CARGO_PKG_VERSION")).into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_rate_limit() -> u64 {
    100
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the libSQL database. Defaults to `~/.personlink/personlink.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
}

/// `[scan]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Glob patterns on link paths (e.g. `/wiki/File:*`) never offered as candidates.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Traversal config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime traversal configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Base URL for resolving relative links.
    pub base_url: String,
    /// Hops to follow from the start page.
    pub max_hops: u32,
    /// User-Agent for page fetches.
    pub user_agent: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Delay before each request in ms.
    pub rate_limit_ms: u64,
    /// Link path globs excluded from candidates.
    pub exclude_patterns: Vec<String>,
}

impl From<&AppConfig> for TraversalConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            base_url: config.site.base_url.clone(),
            max_hops: config.defaults.max_hops,
            user_agent: config.fetch.user_agent.clone(),
            timeout_secs: config.fetch.timeout_secs,
            rate_limit_ms: config.fetch.rate_limit_ms,
            exclude_patterns: config.scan.exclude_patterns.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.personlink/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PersonLinkError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.personlink/personlink.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| PersonLinkError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        PersonLinkError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PersonLinkError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PersonLinkError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PersonLinkError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

impl AppConfig {
    /// Reject values the traversal cannot work with.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.site.base_url).map_err(|e| {
            PersonLinkError::config(format!("invalid site.base_url '{}': {e}", self.site.base_url))
        })?;
        url::Url::parse(&self.defaults.start_url).map_err(|e| {
            PersonLinkError::config(format!(
                "invalid defaults.start_url '{}': {e}",
                self.defaults.start_url
            ))
        })?;
        if self.defaults.max_hops == 0 {
            return Err(PersonLinkError::config("defaults.max_hops must be at least 1"));
        }
        Ok(())
    }

    /// Resolved database path: `[storage].db_path`, else `~/.personlink/personlink.db`.
    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Ok(config_dir()?.join("personlink.db")),
        }
    }
}
