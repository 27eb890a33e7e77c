//! Shared types, error model, and configuration for AgendaFetch.
//!
//! This crate is the foundation depended on by all other AgendaFetch crates.
//! It provides:
//! - [`AgendaFetchError`]: the unified error type
//! - Domain types ([`FolderRef`], [`FileEntry`], [`MatchGroup`], [`OutputManifest`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AgendaConfig, AppConfig, AuthConfig, OutputConfig, RunConfig, SearchConfig, config_dir,
    config_file_path, expand_home, init_config, load_config, load_config_from, parse_keywords,
    table_selector,
};
pub use error::{AgendaFetchError, Result};
pub use types::{
    EntryKind, FileEntry, FolderRef, MatchGroup, OutputManifest, PrefixStyle, VersionOrder,
};
