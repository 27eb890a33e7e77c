//! Application configuration for AgendaFetch.
//!
//! User config lives at `~/.agendafetch/agendafetch.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AgendaFetchError, Result};
use crate::types::{PrefixStyle, VersionOrder};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "agendafetch.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".agendafetch";

// ---------------------------------------------------------------------------
// Config structs (matching agendafetch.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which document to read links from.
    #[serde(default)]
    pub agenda: AgendaConfig,

    /// What to look for inside linked folders.
    #[serde(default)]
    pub search: SearchConfig,

    /// Where to put the results.
    #[serde(default)]
    pub output: OutputConfig,

    /// Credential sources.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// `[agenda]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgendaConfig {
    /// Drive id of the agenda document.
    #[serde(default)]
    pub document_id: String,

    /// 1-indexed table to read links from; 0 reads the whole document.
    #[serde(default)]
    pub table: u32,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Comma-separated keyword list.
    #[serde(default)]
    pub keywords: String,

    /// Only files of this mime type are eligible.
    #[serde(default = "default_target_mime_type")]
    pub target_mime_type: String,

    /// Ordering used to pick the latest version subfolder.
    #[serde(default)]
    pub version_order: VersionOrder,

    /// Upper bound on nested version folders followed from one link.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            target_mime_type: default_target_mime_type(),
            version_order: VersionOrder::default(),
            max_depth: default_max_depth(),
        }
    }
}

fn default_target_mime_type() -> String {
    "application/pdf".into()
}
fn default_max_depth() -> u32 {
    32
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Drive id of the folder the output folder is created in.
    #[serde(default)]
    pub parent_id: String,

    /// Name of the output folder (replaced on every run).
    #[serde(default = "default_folder_name")]
    pub folder_name: String,

    /// Prefix scheme for copied file names.
    #[serde(default)]
    pub prefix_style: PrefixStyle,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            parent_id: String::new(),
            folder_name: default_folder_name(),
            prefix_style: PrefixStyle::default(),
        }
    }
}

fn default_folder_name() -> String {
    "Agenda Files".into()
}

/// `[auth]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Authorized-user token file (client id/secret + refresh token).
    #[serde(default = "default_token_file")]
    pub token_file: String,

    /// Name of an env var holding a ready-to-use access token.
    /// Takes precedence over the token file when set.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_file: default_token_file(),
            access_token_env: default_access_token_env(),
        }
    }
}

fn default_token_file() -> String {
    "~/.agendafetch/token.json".into()
}
fn default_access_token_env() -> String {
    "AGENDAFETCH_ACCESS_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Agenda document id.
    pub document_id: String,
    /// 1-indexed table selector; `None` reads the whole document.
    pub table: Option<u32>,
    /// Parsed, non-empty keywords.
    pub keywords: Vec<String>,
    /// Eligible file mime type.
    pub target_mime_type: String,
    /// Version folder ordering.
    pub version_order: VersionOrder,
    /// Descent bound.
    pub max_depth: u32,
    /// Destination parent folder id.
    pub parent_id: String,
    /// Destination folder name.
    pub folder_name: String,
    /// Copy name prefix scheme.
    pub prefix_style: PrefixStyle,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            document_id: config.agenda.document_id.clone(),
            table: table_selector(config.agenda.table),
            keywords: parse_keywords(&config.search.keywords),
            target_mime_type: config.search.target_mime_type.clone(),
            version_order: config.search.version_order,
            max_depth: config.search.max_depth,
            parent_id: config.output.parent_id.clone(),
            folder_name: config.output.folder_name.clone(),
            prefix_style: config.output.prefix_style,
        }
    }
}

impl RunConfig {
    /// Check that everything a run needs is present.
    pub fn validate(&self) -> Result<()> {
        if self.document_id.trim().is_empty() {
            return Err(AgendaFetchError::config(
                "agenda document id is not set ([agenda] document_id or --document-id)",
            ));
        }
        self.validate_output()?;
        if self.keywords.is_empty() {
            return Err(AgendaFetchError::config(
                "no keywords configured ([search] keywords or --keywords)",
            ));
        }
        if self.max_depth == 0 {
            return Err(AgendaFetchError::config("[search] max_depth must be at least 1"));
        }
        Ok(())
    }

    fn validate_output(&self) -> Result<()> {
        if self.parent_id.trim().is_empty() {
            return Err(AgendaFetchError::config(
                "output parent folder id is not set ([output] parent_id or --parent-id)",
            ));
        }
        if self.folder_name.trim().is_empty() {
            return Err(AgendaFetchError::config("output folder name must not be empty"));
        }
        Ok(())
    }
}

/// Map the config file's `table` value to a selector (`0` means none).
pub fn table_selector(table: u32) -> Option<u32> {
    (table != 0).then_some(table)
}

/// Split a comma-separated keyword list, trimming whitespace and dropping empties.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.agendafetch/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AgendaFetchError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.agendafetch/agendafetch.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| AgendaFetchError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        AgendaFetchError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AgendaFetchError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AgendaFetchError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AgendaFetchError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
