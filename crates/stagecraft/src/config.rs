//! Tool configuration
//!
//! Reads settings from `$STAGECRAFT_HOME/config.toml`, where
//! `STAGECRAFT_HOME` defaults to `~/.stagecraft`:
//!
//! ```toml
//! [catalog]
//! backend = "json"      # or "memory"; the binary defaults to "json"
//! path = "/srv/stagecraft/tables"
//!
//! [approvals]
//! dir = "/srv/stagecraft/approvals"
//!
//! [logging]
//! filter = "stagecraft=debug"
//! dir = "/srv/stagecraft/logs"
//! ```

use serde::Deserialize;
use stagecraft_catalog::{JsonDirCatalog, MemoryCatalog, TableCatalog};
use std::path::{Path, PathBuf};

/// Error type for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config not found at: {0}")]
    NotFound(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] stagecraft_catalog::CatalogError),
}

/// Result type for config operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable overriding the home directory.
pub const HOME_ENV: &str = "STAGECRAFT_HOME";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StagecraftConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub approvals: ApprovalsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogBackend {
    #[default]
    Memory,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Storage backend. Unset means in-memory for an embedded tool; see
    /// [`StagecraftConfig::with_home_defaults`].
    #[serde(default)]
    pub backend: Option<CatalogBackend>,

    /// Table directory for the json backend; defaults to `<home>/tables`
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApprovalsConfig {
    /// Directory holding the pending approval round. Without it a round
    /// lives only as long as the process.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Tracing filter used when RUST_LOG is unset
    #[serde(default)]
    pub filter: Option<String>,

    /// Directory for daily rolling log files
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Home directory: `STAGECRAFT_HOME`, else `~/.stagecraft`.
pub fn stagecraft_home() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| ConfigError::NotFound("Could not find home directory".to_string()))?;
    Ok(home.join(".stagecraft"))
}

/// Load config from `config_path`, falling back to defaults when the file
/// does not exist.
pub fn load_config(config_path: &Path) -> Result<StagecraftConfig> {
    if !config_path.exists() {
        return Ok(StagecraftConfig::default());
    }
    let content = std::fs::read_to_string(config_path)?;
    Ok(toml::from_str(&content)?)
}

/// Load config from the default location.
pub fn load_default_config() -> Result<StagecraftConfig> {
    load_config(&stagecraft_home()?.join("config.toml"))
}

impl StagecraftConfig {
    /// Fill what the file left unset so state outlives the process: tables
    /// go to a json catalog under `home/tables` and the open approval round
    /// to `home/approvals`. An explicit `memory` backend is kept.
    pub fn with_home_defaults(mut self, home: &Path) -> Self {
        if self.catalog.backend.is_none() {
            self.catalog.backend = Some(CatalogBackend::Json);
            if self.catalog.path.is_none() {
                self.catalog.path = Some(home.join("tables"));
            }
        }
        if self.approvals.dir.is_none() {
            self.approvals.dir = Some(home.join("approvals"));
        }
        self
    }

    /// Open the configured catalog backend.
    pub fn open_catalog(&self) -> Result<Box<dyn TableCatalog>> {
        match self.catalog.backend.unwrap_or_default() {
            CatalogBackend::Memory => Ok(Box::new(MemoryCatalog::new())),
            CatalogBackend::Json => {
                let dir = match &self.catalog.path {
                    Some(path) => path.clone(),
                    None => stagecraft_home()?.join("tables"),
                };
                Ok(Box::new(JsonDirCatalog::open(dir)?))
            }
        }
    }
}
