//! One fetch-and-reconcile cycle for a single monitor.
//!
//! [`RefreshService::fetch`] asks the server for the authoritative current
//! record; [`RefreshService::apply`] merges the outcome into the store. On
//! success the fetched record wholesale-replaces the prior entry (the server
//! is authoritative, there is no field-level diffing). On any failure the
//! previous record is retained and the next due tick retries naturally — no
//! retry or backoff lives here.

use std::sync::Arc;

use console_api::ApiClient;
use console_core::error::ConsoleError;
use console_core::models::{Monitor, MonitorId};

use crate::store::MonitorStore;

// ── Outcome types ─────────────────────────────────────────────────────────────

/// Result of one refresh fetch, posted back to the engine loop.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// 200: the fetched record replaces the prior entry.
    Replaced(Box<Monitor>),
    /// Anything else: state is untouched for this attempt.
    Failed { id: MonitorId, error: ConsoleError },
}

impl RefreshOutcome {
    pub fn id(&self) -> MonitorId {
        match self {
            RefreshOutcome::Replaced(monitor) => monitor.id,
            RefreshOutcome::Failed { id, .. } => *id,
        }
    }
}

/// What applying an outcome did to the store.
#[derive(Debug)]
pub enum Applied {
    /// The record was replaced in place.
    Replaced(MonitorId),
    /// A late completion for a monitor deleted locally in the meantime; the
    /// result was discarded rather than resurrecting the entry.
    Discarded(MonitorId),
    /// The server no longer knows the id; the local entry was dropped.
    DroppedStale {
        id: MonitorId,
        selection_cleared: bool,
    },
    /// Transient failure; previous state retained, warning text surfaced.
    Failed { id: MonitorId, warning: String },
}

// ── RefreshService ────────────────────────────────────────────────────────────

/// Fetches one monitor's authoritative record and reconciles it into state.
///
/// Idempotent with respect to final state: given a consistent server
/// response, applying the same refresh twice leaves the store identical.
#[derive(Debug, Clone)]
pub struct RefreshService {
    client: Arc<ApiClient>,
}

impl RefreshService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Fetch the current record for `id`. Never errors outward; failures are
    /// folded into the outcome so the engine loop stays infallible.
    pub async fn fetch(&self, id: MonitorId) -> RefreshOutcome {
        match self.client.get_monitor(id).await {
            Ok(monitor) => RefreshOutcome::Replaced(Box::new(monitor)),
            Err(error) => {
                tracing::debug!(id, error = %error, "monitor refresh failed");
                RefreshOutcome::Failed { id, error }
            }
        }
    }

    /// Merge an outcome into the store.
    ///
    /// Selection needs no special handling on replacement: it is id-based,
    /// so dependent views observe the new checks and counters the moment the
    /// record is swapped.
    pub fn apply(outcome: RefreshOutcome, store: &mut MonitorStore) -> Applied {
        match outcome {
            RefreshOutcome::Replaced(monitor) => {
                let id = monitor.id;
                if store.get(id).is_none() {
                    // Deleted while the fetch was in flight.
                    tracing::debug!(id, "discarding refresh result for removed monitor");
                    return Applied::Discarded(id);
                }
                store.upsert(*monitor);
                Applied::Replaced(id)
            }
            RefreshOutcome::Failed {
                id,
                error: ConsoleError::StaleReference(_),
            } => {
                let removal = store.remove(id);
                tracing::debug!(id, "dropped monitor no longer known to the server");
                Applied::DroppedStale {
                    id,
                    selection_cleared: removal.selection_cleared,
                }
            }
            RefreshOutcome::Failed { id, error } => Applied::Failed {
                id,
                warning: error.to_string(),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
