use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned monitor identifier. Unique and never reused; all identity
/// (selection, persistence, in-flight tracking) is keyed by this value, never
/// by the mutable display name.
pub type MonitorId = u64;

// ── Connection type ───────────────────────────────────────────────────────────

/// Kind of probe the server runs against a monitor's target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// HTTP(S) request against a URL.
    Http,
    /// ICMP echo against a host.
    Ping,
    /// Raw TCP connect against host:port.
    Tcp,
    /// Container liveness check by container name.
    Container,
}

// ── Health ────────────────────────────────────────────────────────────────────

/// Tri-state health of a monitor.
///
/// The wire representation is the server's nullable boolean (`healthy`);
/// `null` means no check has produced a verdict yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Unhealthy,
    Unknown,
}

impl From<Option<bool>> for Health {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Health::Healthy,
            Some(false) => Health::Unhealthy,
            None => Health::Unknown,
        }
    }
}

// ── Notification configuration ────────────────────────────────────────────────

/// How an enabled notification is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMethod {
    Webhook,
    Email,
}

/// Per-monitor notification configuration.
///
/// Modeled as a tagged variant rather than a flat record with conditionally
/// meaningful fields; the flat server shape is converted at the serde boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "NotificationWire", into = "NotificationWire")]
pub enum NotificationConfig {
    /// No notification is sent for this monitor.
    #[default]
    Disabled,
    /// Notify `destination` via `method` when a check flips health.
    Enabled {
        method: NotificationMethod,
        destination: String,
    },
}

/// Flat notification record as the server stores and serves it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct NotificationWire {
    #[serde(default)]
    enabled: bool,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    webhook: String,
    #[serde(default)]
    email: String,
}

impl From<NotificationWire> for NotificationConfig {
    fn from(wire: NotificationWire) -> Self {
        if !wire.enabled {
            return NotificationConfig::Disabled;
        }
        match wire.kind.as_str() {
            "email" => NotificationConfig::Enabled {
                method: NotificationMethod::Email,
                destination: wire.email,
            },
            // The server treats anything else as a webhook.
            _ => NotificationConfig::Enabled {
                method: NotificationMethod::Webhook,
                destination: wire.webhook,
            },
        }
    }
}

impl From<NotificationConfig> for NotificationWire {
    fn from(config: NotificationConfig) -> Self {
        match config {
            NotificationConfig::Disabled => NotificationWire::default(),
            NotificationConfig::Enabled {
                method,
                destination,
            } => match method {
                NotificationMethod::Webhook => NotificationWire {
                    enabled: true,
                    kind: "webhook".to_string(),
                    webhook: destination,
                    email: String::new(),
                },
                NotificationMethod::Email => NotificationWire {
                    enabled: true,
                    kind: "email".to_string(),
                    webhook: String::new(),
                    email: destination,
                },
            },
        }
    }
}

// ── Check ─────────────────────────────────────────────────────────────────────

/// One historical probe result recorded against a monitor.
///
/// Checks are immutable and append-only; the server returns them ordered by
/// creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    /// When the probe ran (UTC).
    pub created: DateTime<Utc>,
    /// Whether the probe succeeded.
    pub success: bool,
    /// Result text on success, error text on failure.
    #[serde(default)]
    pub result: String,
    /// Probe round-trip time in milliseconds.
    #[serde(default)]
    pub response_time_ms: i64,
    /// Whether a notification was sent for this check.
    #[serde(default)]
    pub notified: bool,
}

// ── HTTP header ───────────────────────────────────────────────────────────────

/// Extra request header sent by the server's HTTP probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpHeader {
    pub key: String,
    pub value: String,
}

// ── Monitor ───────────────────────────────────────────────────────────────────

/// A configured target whose reachability is checked on a fixed interval.
///
/// The server is authoritative: refresh replaces a record wholesale, there is
/// no client-side field-level merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    /// Immutable server-assigned identifier.
    pub id: MonitorId,
    /// Disabled monitors are never polled.
    #[serde(default)]
    pub enabled: bool,
    /// Mutable display name; never an identity key.
    pub name: String,
    /// Connection target (URL, host, host:port, or container name).
    pub connection: String,
    pub connection_type: ConnectionType,
    /// HTTP verb used by the HTTP probe; empty for other probe types.
    #[serde(default)]
    pub http_method: String,
    /// Check interval in seconds, strictly positive.
    pub interval: u32,
    /// Nullable health verdict; `None` until a check has run.
    #[serde(default)]
    pub healthy: Option<bool>,
    /// Whether every check is persisted, or only health transitions.
    #[serde(default)]
    pub always_save: bool,
    /// When the last check ran; `None` is the "never checked" sentinel.
    #[serde(default)]
    pub checked: Option<DateTime<Utc>>,
    /// Text of the most recent check result or error.
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub total_checks: u64,
    #[serde(default)]
    pub successful_checks: u64,
    /// Extra request headers for the HTTP probe.
    #[serde(default)]
    pub headers: Vec<HttpHeader>,
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Check history, ordered by creation time.
    #[serde(default)]
    pub checks: Vec<Check>,
}

impl Monitor {
    /// Derived tri-state health.
    pub fn health(&self) -> Health {
        Health::from(self.healthy)
    }

    /// `true` while the monitor has never been checked.
    pub fn never_checked(&self) -> bool {
        self.checked.is_none()
    }

    /// Fraction of successful checks, or `None` before the first check.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_checks == 0 {
            return None;
        }
        Some(self.successful_checks as f64 / self.total_checks as f64)
    }
}

// ── Monitor form ──────────────────────────────────────────────────────────────

/// Request body for creating or updating a monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorForm {
    pub enabled: bool,
    pub name: String,
    pub connection: String,
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub http_method: String,
    /// Probe timeout in seconds; 0 lets the server pick its default.
    #[serde(default)]
    pub timeout: u32,
    /// Request body for the HTTP probe.
    #[serde(default)]
    pub body: String,
    pub interval: u32,
    pub always_save: bool,
    #[serde(default)]
    pub headers: Vec<HttpHeader>,
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl MonitorForm {
    /// Client-side validation mirroring the server's required-field rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.connection.trim().is_empty() {
            return Err("connection target must not be empty".to_string());
        }
        if self.interval == 0 {
            return Err("check interval must be greater than zero".to_string());
        }
        if self.name.len() > 64 {
            return Err("name must be at most 64 characters".to_string());
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
