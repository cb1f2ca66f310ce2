//! Server configuration.
//!
//! Options come from the command line, with environment variable fallbacks.
//! A `.env` file in the working directory is loaded first if present.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Directory login service options.
#[derive(Debug, Clone, Parser)]
#[command(name = "dl-server", version, about)]
pub struct ServerConfig {
    /// Path of the TOML configuration file holding the `[ldap]` table.
    #[arg(short, long, env = "DL_CONFIG", default_value = "system.toml")]
    pub config: PathBuf,

    /// How often the configuration file is checked for changes, in seconds.
    #[arg(long, env = "DL_POLL_INTERVAL_SECS", default_value_t = 5)]
    pub poll_interval_secs: u64,

    /// Build the directory context once, report the result, and exit.
    #[arg(long)]
    pub check: bool,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "DL_LOG", default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Loads configuration from the command line and environment.
    #[must_use]
    pub fn from_args() -> Self {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    /// Creates a configuration for testing.
    #[must_use]
    pub fn for_testing(config: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            poll_interval_secs: 1,
            check: false,
            log_level: "debug".to_string(),
        }
    }

    /// Returns the file poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
