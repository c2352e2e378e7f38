use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, TriageError};

/// Top-level configuration for the Triage application.
///
/// Loaded from `~/.triage/config.toml` by default. Each section corresponds
/// to a bounded context or cross-cutting concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl TriageConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TriageConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| TriageError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// API server port.
    pub port: u16,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Optional JSON file of ticket records loaded into the in-memory store
    /// at startup. Empty means start with an empty store.
    pub ticket_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            port: 3080,
            log_level: "info".to_string(),
            ticket_file: String::new(),
        }
    }
}

/// Conversational engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum interactions kept per session (ring buffer capacity).
    pub history_capacity: usize,
    /// Sessions idle longer than this are evicted by the sweep.
    pub session_expiry_minutes: u32,
    /// How often the background sweep runs.
    pub sweep_interval_minutes: u32,
    /// Page size for general listings.
    pub page_size: usize,
    /// Page size for identifier-only listings.
    pub id_page_size: usize,
    /// Resume offset used when a continuation arrives with no recorded offset.
    pub default_resume_offset: usize,
    /// Query executor correction attempts before the ultimate fallback.
    pub max_retries: usize,
    /// Default result limit for plans without an explicit one.
    pub default_limit: usize,
    /// Hard cap on any plan's result limit.
    pub max_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_capacity: 10,
            session_expiry_minutes: 120,
            sweep_interval_minutes: 60,
            page_size: 20,
            id_page_size: 50,
            default_resume_offset: 20,
            max_retries: 3,
            default_limit: 50,
            max_limit: 1000,
        }
    }
}
