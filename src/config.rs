//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};
use clap::Parser;

/// Directory name used under the platform data directory
const APP_DIR_NAME: &str = "tab-timer";

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "tab-timer")]
#[command(about = "A countdown timer that survives restarts, one per tab")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory holding persisted timers, settings and history
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Use this tab identity instead of the one remembered for the session
    #[arg(long)]
    pub tab_id: Option<String>,

    /// Forget the session's tab identity and start as a new tab
    #[arg(long, conflicts_with = "tab_id")]
    pub new_tab: bool,

    /// Ticker polling interval in milliseconds
    #[arg(long, default_value = "250", value_parser = clap::value_parser!(u64).range(10..=1000))]
    pub tick_ms: u64,

    /// Never ring the terminal bell
    #[arg(long)]
    pub silent_bell: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Resolve the data directory, falling back to the platform default
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR_NAME)))
        })
    }

    /// Directory for values scoped to one session, such as the tab identity
    pub fn session_dir(&self) -> PathBuf {
        self.data_dir().join("session")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["tab-timer"]);
        assert_eq!(config.port, 20554);
        assert_eq!(config.address(), "127.0.0.1:20554");
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
        assert!(!config.silent_bell);
        assert!(config.tab_id.is_none());
    }

    #[test]
    fn test_explicit_data_dir_and_session_dir() {
        let config = Config::parse_from(["tab-timer", "--data-dir", "/tmp/timers", "-v"]);
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/timers"));
        assert_eq!(config.session_dir(), PathBuf::from("/tmp/timers/session"));
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn test_tick_ms_out_of_range_is_rejected() {
        assert!(Config::try_parse_from(["tab-timer", "--tick-ms", "5"]).is_err());
        assert!(Config::try_parse_from(["tab-timer", "--tick-ms", "5000"]).is_err());
    }

    #[test]
    fn test_new_tab_conflicts_with_tab_id() {
        let result = Config::try_parse_from(["tab-timer", "--new-tab", "--tab-id", "tab-1"]);
        assert!(result.is_err());
    }
}
