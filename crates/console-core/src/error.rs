use thiserror::Error;

use crate::models::MonitorId;

/// All errors produced by the uptime console.
///
/// Nothing in here is fatal: every variant degrades to "retain last known
/// good state" at the runtime boundary, surfaced at most as a warning.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// The request never reached the server. Retried implicitly on the next
    /// scheduled attempt.
    #[error("could not reach server, try again later")]
    NetworkUnreachable {
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-200 status and an error message, which
    /// is surfaced to the user verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// A locally held monitor id no longer exists server-side.
    #[error("monitor {0} no longer exists")]
    StaleReference(MonitorId),

    /// A JSON document could not be parsed.
    #[error("failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Pass-through for raw I/O errors (selection persistence).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConsoleError {
    /// `true` when the failure is transient and the next tick will retry it.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConsoleError::NetworkUnreachable { .. } | ConsoleError::Api { .. }
        )
    }
}

/// Convenience alias used throughout the console crates.
pub type Result<T> = std::result::Result<T, ConsoleError>;
