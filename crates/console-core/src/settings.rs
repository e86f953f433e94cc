use clap::Parser;
use std::path::PathBuf;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Console client for an uptime-monitoring server
#[derive(Parser, Debug, Clone)]
#[command(
    name = "uptime-console",
    about = "Console client for an uptime-monitoring server",
    version
)]
pub struct Settings {
    /// Base URL of the monitoring server
    #[arg(long, env = "UPTIME_SERVER_URL", default_value = "http://localhost:8080")]
    pub server_url: String,

    /// Poll scheduler tick period in seconds (1-60)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u64).range(1..=60))]
    pub poll_period_secs: u64,

    /// Select this monitor id at startup, overriding the persisted selection
    #[arg(long)]
    pub select: Option<u64>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear the persisted monitor selection and start fresh
    #[arg(long)]
    pub clear: bool,
}

impl Settings {
    /// Effective log level after applying the `--debug` override.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
