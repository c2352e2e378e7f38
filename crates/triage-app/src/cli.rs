//! CLI argument definitions for the Triage application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Triage — a conversational assistant over support-ticket records.
#[derive(Parser, Debug)]
#[command(name = "triage", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// JSON file of ticket records to load into the in-memory store.
    #[arg(short = 't', long = "tickets")]
    pub tickets: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TRIAGE_CONFIG env var > ~/.triage/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TRIAGE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the API server port.
    ///
    /// Priority: --port flag > TRIAGE_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("TRIAGE_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    /// Resolve the ticket fixture file.
    ///
    /// Priority: --tickets flag > config file value. Empty means none.
    pub fn resolve_ticket_file(&self, config_value: &str) -> Option<PathBuf> {
        if let Some(ref p) = self.tickets {
            return Some(p.clone());
        }
        if config_value.is_empty() {
            None
        } else {
            Some(PathBuf::from(config_value))
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_value: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_value.to_string())
    }
}

fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".triage").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CliArgs {
        CliArgs {
            config: None,
            port: None,
            tickets: None,
            log_level: None,
        }
    }

    #[test]
    fn test_resolve_port_prefers_flag() {
        let mut a = args();
        a.port = Some(9000);
        assert_eq!(a.resolve_port(3080), 9000);
    }

    #[test]
    fn test_resolve_port_falls_back_to_config() {
        assert_eq!(args().resolve_port(3080), 3080);
    }

    #[test]
    fn test_resolve_config_path_prefers_flag() {
        let mut a = args();
        a.config = Some(PathBuf::from("/tmp/custom.toml"));
        assert_eq!(a.resolve_config_path(), PathBuf::from("/tmp/custom.toml"));
    }

    #[test]
    fn test_resolve_ticket_file_empty_config_is_none() {
        assert!(args().resolve_ticket_file("").is_none());
        assert_eq!(
            args().resolve_ticket_file("/data/tickets.json"),
            Some(PathBuf::from("/data/tickets.json"))
        );
    }

    #[test]
    fn test_resolve_log_level() {
        assert_eq!(args().resolve_log_level("info"), "info");
        let mut a = args();
        a.log_level = Some("debug".to_string());
        assert_eq!(a.resolve_log_level("info"), "debug");
    }
}
