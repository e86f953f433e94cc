//! JSON API client for the monitoring server.
//!
//! Thin wrapper over [`reqwest::Client`] with a cookie store so every request
//! carries session credentials. HTTP 200 signals success; any other status
//! carries a JSON body with a human-readable `error` field which is mapped to
//! [`ConsoleError::Api`]. Transport failures map to
//! [`ConsoleError::NetworkUnreachable`] and are retried implicitly by the next
//! scheduled attempt — this client applies no retry or backoff of its own.

use std::collections::BTreeMap;

use serde::Deserialize;

use console_core::error::{ConsoleError, Result};
use console_core::models::{Monitor, MonitorForm, MonitorId};

// ── Error body ────────────────────────────────────────────────────────────────

/// Shape of every non-200 response body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: String,
}

// ── ApiClient ─────────────────────────────────────────────────────────────────

/// Client for the server's `/api` monitor endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the server at `base_url` (scheme + host + port,
    /// trailing slash tolerated).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ConsoleError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    // ── Monitor endpoints ─────────────────────────────────────────────────

    /// `GET /api/monitors` — all monitors, in stable server-list order
    /// (ascending id, matching the server's map keyed by id).
    pub async fn list_monitors(&self) -> Result<Vec<Monitor>> {
        let response = self
            .http
            .get(self.url("monitors"))
            .send()
            .await
            .map_err(unreachable_err)?;

        let response = Self::check_status(response).await?;

        // The server returns a map keyed by the stringified id; a BTreeMap
        // alone would order keys lexicographically ("10" < "2"), so order by
        // the numeric id instead.
        let by_id: BTreeMap<String, Monitor> =
            response.json().await.map_err(unreachable_err)?;
        let mut monitors: Vec<Monitor> = by_id.into_values().collect();
        monitors.sort_by_key(|m| m.id);
        Ok(monitors)
    }

    /// `GET /api/monitor/{id}` — one monitor including its check history.
    /// A 404 maps to [`ConsoleError::StaleReference`].
    pub async fn get_monitor(&self, id: MonitorId) -> Result<Monitor> {
        let response = self
            .http
            .get(self.url(&format!("monitor/{id}")))
            .send()
            .await
            .map_err(unreachable_err)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ConsoleError::StaleReference(id));
        }

        let response = Self::check_status(response).await?;
        response.json().await.map_err(unreachable_err)
    }

    /// `POST /api/monitor` — create; returns the created record with its
    /// server-assigned id.
    pub async fn create_monitor(&self, form: &MonitorForm) -> Result<Monitor> {
        let response = self
            .http
            .post(self.url("monitor"))
            .json(form)
            .send()
            .await
            .map_err(unreachable_err)?;

        let response = Self::check_status(response).await?;
        response.json().await.map_err(unreachable_err)
    }

    /// `PUT /api/monitor/{id}` — update with the same form shape. The server
    /// expects the id inside the body as well and returns no payload.
    pub async fn update_monitor(&self, id: MonitorId, form: &MonitorForm) -> Result<()> {
        #[derive(serde::Serialize)]
        struct UpdateBody<'a> {
            id: MonitorId,
            #[serde(flatten)]
            form: &'a MonitorForm,
        }

        let response = self
            .http
            .put(self.url(&format!("monitor/{id}")))
            .json(&UpdateBody { id, form })
            .send()
            .await
            .map_err(unreachable_err)?;

        Self::check_status(response).await?;
        Ok(())
    }

    /// `DELETE /api/monitor/{id}`.
    pub async fn delete_monitor(&self, id: MonitorId) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("monitor/{id}")))
            .send()
            .await
            .map_err(unreachable_err)?;

        Self::check_status(response).await?;
        Ok(())
    }

    /// `POST /api/monitor/{id}/run` — force an immediate out-of-cycle check;
    /// returns the freshly checked record.
    pub async fn run_monitor(&self, id: MonitorId) -> Result<Monitor> {
        let response = self
            .http
            .post(self.url(&format!("monitor/{id}/run")))
            .send()
            .await
            .map_err(unreachable_err)?;

        let response = Self::check_status(response).await?;
        response.json().await.map_err(unreachable_err)
    }

    // ── Private helpers ───────────────────────────────────────────────────

    /// Pass 200 responses through; turn anything else into
    /// [`ConsoleError::Api`] with the body's `error` text.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) if !body.error.is_empty() => body.error,
            _ => "unknown error occurred".to_string(),
        };

        tracing::debug!(status = status.as_u16(), %message, "api request failed");
        Err(ConsoleError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Map a transport-level failure; the server was never reached (or the
/// connection died mid-response).
fn unreachable_err(source: reqwest::Error) -> ConsoleError {
    ConsoleError::NetworkUnreachable { source }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use console_core::models::{ConnectionType, NotificationConfig};

    fn monitor_body(id: u64, name: &str) -> String {
        format!(
            r#"{{"id": {id}, "enabled": true, "name": "{name}",
                 "connection": "https://example.com", "connectionType": "http",
                 "interval": 30, "healthy": true,
                 "checked": "2024-05-01T10:00:00Z", "checks": []}}"#
        )
    }

    fn test_form() -> MonitorForm {
        MonitorForm {
            enabled: true,
            name: "api".to_string(),
            connection: "https://example.com".to_string(),
            connection_type: ConnectionType::Http,
            http_method: "GET".to_string(),
            timeout: 0,
            body: String::new(),
            interval: 30,
            always_save: false,
            headers: vec![],
            notification: NotificationConfig::Disabled,
        }
    }

    // ── list_monitors ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_list_monitors_orders_by_numeric_id() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            r#"{{"10": {}, "2": {}}}"#,
            monitor_body(10, "ten"),
            monitor_body(2, "two")
        );
        let mock = server
            .mock("GET", "/api/monitors")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let monitors = client.list_monitors().await.unwrap();

        let ids: Vec<u64> = monitors.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![2, 10]);
        mock.assert_async().await;
    }

    // ── get_monitor ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_monitor_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/monitor/3")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(monitor_body(3, "api"))
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let monitor = client.get_monitor(3).await.unwrap();

        assert_eq!(monitor.id, 3);
        assert_eq!(monitor.name, "api");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_monitor_404_is_stale_reference() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/monitor/99")
            .with_status(404)
            .with_body(r#"{"error": "monitor with id '99' not found"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let err = client.get_monitor(99).await.unwrap_err();

        assert!(matches!(err, ConsoleError::StaleReference(99)));
    }

    // ── error mapping ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_non_200_surfaces_error_field_verbatim() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/monitors")
            .with_status(500)
            .with_body(r#"{"error": "database is on fire"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let err = client.list_monitors().await.unwrap_err();

        match err {
            ConsoleError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "database is on fire");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_200_without_body_uses_fallback_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/api/monitor/1")
            .with_status(500)
            .with_body("")
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let err = client.delete_monitor(1).await.unwrap_err();

        assert_eq!(err.to_string(), "unknown error occurred");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Nothing listens on this port.
        let client = ApiClient::new("http://127.0.0.1:1").unwrap();
        let err = client.list_monitors().await.unwrap_err();
        assert!(matches!(err, ConsoleError::NetworkUnreachable { .. }));
        assert!(err.is_transient());
    }

    // ── create / update / run ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_create_monitor_returns_server_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/monitor")
            .match_header("content-type", "application/json")
            .with_status(200)
            .with_body(monitor_body(7, "api"))
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let created = client.create_monitor(&test_form()).await.unwrap();

        assert_eq!(created.id, 7);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_monitor_sends_id_in_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/monitor/7")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "id": 7,
                "name": "api",
                "connectionType": "http"
            })))
            .with_status(200)
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        client.update_monitor(7, &test_form()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_run_monitor_returns_fresh_record() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/monitor/4/run")
            .with_status(200)
            .with_body(monitor_body(4, "api"))
            .create_async()
            .await;

        let client = ApiClient::new(server.url()).unwrap();
        let monitor = client.run_monitor(4).await.unwrap();

        assert_eq!(monitor.id, 4);
        mock.assert_async().await;
    }

    // ── base url handling ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_trailing_slash_in_base_url_is_tolerated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/monitors")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/", server.url())).unwrap();
        let monitors = client.list_monitors().await.unwrap();
        assert!(monitors.is_empty());
    }
}
