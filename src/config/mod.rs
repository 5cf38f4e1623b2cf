//! Configuration module for datacubes-rs
//!
//! This module handles the runtime configuration of the synchronization core:
//! - Scene mapping constants shared by both sync directions
//! - Ingestion behaviour (spreadsheet polling period, HTTP timeouts, ordering)
//! - Spreadsheet API credentials
//! - The external high-quality renderer endpoint
//!
//! # Config Location
//!
//! The configuration file is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.datacubes.datacubes-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/dev.datacubes.datacubes-rs/config.toml`
//! - **Windows**: `%APPDATA%\dev.datacubes.datacubes-rs\config.toml`
//!
//! Every field has a default, so a partial file (or none at all) is valid.
//!
//! # Example
//!
//! ```ignore
//! use datacubes_rs::config::AppConfig;
//!
//! let config = AppConfig::load_or_default();
//! let mapper = config.scene.mapper();
//! println!("polling every {:?}", config.ingestion.poll_interval());
//! ```

use crate::error::{DatacubesError, Result};
use crate::scene::CoordinateMapper;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.datacubes.datacubes-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default spreadsheet refresh period in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Default timeout for dataset downloads in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default number of rows between two ingestion progress events
pub const DEFAULT_PROGRESS_CHUNK_ROWS: usize = 4096;

/// Environment variable consulted for the spreadsheet API key
pub const DEFAULT_SHEETS_API_KEY_ENV: &str = "GOOGLE_SHEETS_API_KEY";

/// Default spreadsheet values API
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Default high-quality renderer endpoint
pub const DEFAULT_RENDER_ENDPOINT: &str = "http://localhost:8000/api/renderings/";

/// Default timeout for a high-quality render in seconds
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 300;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Get the path to the default config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Complete configuration of the core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scene: SceneConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub spreadsheet: SpreadsheetConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

impl AppConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DatacubesError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DatacubesError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load the config from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DatacubesError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| DatacubesError::Config(format!("Failed to write config: {}", e)))
    }
}

// ==================== Scene ====================

/// Mapping between graph pixels and normalized scene space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    #[serde(default = "default_min_x")]
    pub min_x: f64,

    #[serde(default = "default_min_y")]
    pub min_y: f64,

    #[serde(default = "default_step")]
    pub step: f64,
}

fn default_min_x() -> f64 {
    CoordinateMapper::GRAPH_CANVAS.min_x
}

fn default_min_y() -> f64 {
    CoordinateMapper::GRAPH_CANVAS.min_y
}

fn default_step() -> f64 {
    CoordinateMapper::GRAPH_CANVAS.step
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            min_x: default_min_x(),
            min_y: default_min_y(),
            step: default_step(),
        }
    }
}

impl SceneConfig {
    /// The single mapper instance both sync directions must share.
    ///
    /// A non-positive step would make the mapping non-invertible; it falls back
    /// to the canvas constants.
    pub fn mapper(&self) -> CoordinateMapper {
        if self.step > 0.0 && self.step.is_finite() {
            CoordinateMapper::new(self.min_x, self.min_y, self.step)
        } else {
            tracing::warn!("Invalid scene step {}, using canvas defaults", self.step);
            CoordinateMapper::GRAPH_CANVAS
        }
    }
}

// ==================== Ingestion ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Spreadsheet refresh period
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Timeout for remote dataset downloads
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Discard completions of superseded ingestions instead of letting the last
    /// completion win.
    #[serde(default)]
    pub strict_ordering: bool,

    /// Rows between two progress events while building columns
    #[serde(default = "default_progress_chunk_rows")]
    pub progress_chunk_rows: usize,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_progress_chunk_rows() -> usize {
    DEFAULT_PROGRESS_CHUNK_ROWS
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            strict_ordering: false,
            progress_chunk_rows: DEFAULT_PROGRESS_CHUNK_ROWS,
        }
    }
}

impl IngestionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

// ==================== Spreadsheet ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpreadsheetConfig {
    /// Explicit API key; takes precedence over the environment
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of the spreadsheet values API
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_api_key_env() -> String {
    DEFAULT_SHEETS_API_KEY_ENV.to_string()
}

fn default_api_base() -> String {
    DEFAULT_SHEETS_API_BASE.to_string()
}

impl Default for SpreadsheetConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: default_api_key_env(),
            api_base: default_api_base(),
        }
    }
}

impl SpreadsheetConfig {
    /// Resolve the API key from the config or the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.is_empty())
    }
}

// ==================== Render ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// URL the render request is POSTed to
    #[serde(default = "default_render_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_render_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_render_endpoint() -> String {
    DEFAULT_RENDER_ENDPOINT.to_string()
}

fn default_render_timeout_secs() -> u64 {
    DEFAULT_RENDER_TIMEOUT_SECS
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: default_render_endpoint(),
            timeout_secs: DEFAULT_RENDER_TIMEOUT_SECS,
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
