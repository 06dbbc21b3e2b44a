//! Shared types, error model, and configuration for personlink.
//!
//! This crate is the foundation depended on by all other personlink crates.
//! It provides:
//! - [`PersonLinkError`] — the unified error type
//! - Domain types ([`PersonDetails`], [`ParagraphLink`], [`PersonConnection`])
//! - Configuration ([`AppConfig`], [`TraversalConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, ScanConfig, SiteConfig, StorageConfig,
    TraversalConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{PersonLinkError, Result};
pub use types::{ParagraphLink, PersonConnection, PersonDetails};
