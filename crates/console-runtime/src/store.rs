//! In-memory monitor collection and selection.
//!
//! [`MonitorStore`] is the sole source of truth for rendering: the current
//! monitors in stable server-list order plus the active selection. There is
//! exactly one owner (the engine task), so updates are serialized and
//! last-writer-wins per id without any locking.

use console_core::models::{Monitor, MonitorId};

// ── Removal ───────────────────────────────────────────────────────────────────

/// Result of [`MonitorStore::remove`].
///
/// `selection_cleared` tells the caller to also clear the persisted selection
/// value; the store itself never touches disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Removal {
    pub removed: bool,
    pub selection_cleared: bool,
}

// ── MonitorStore ──────────────────────────────────────────────────────────────

/// Authoritative in-process collection of monitor records.
///
/// Identity is keyed strictly by the immutable server-assigned id, never by
/// the mutable display name: a monitor can be renamed without losing its
/// identity or colliding with another monitor that inherits the old name.
#[derive(Debug, Default)]
pub struct MonitorStore {
    monitors: Vec<Monitor>,
    selected: Option<MonitorId>,
}

impl MonitorStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Current monitors in stable server-list order.
    pub fn list(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn get(&self, id: MonitorId) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.id == id)
    }

    /// Currently selected monitor, or none.
    pub fn selected(&self) -> Option<&Monitor> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<MonitorId> {
        self.selected
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    // ── Mutations ─────────────────────────────────────────────────────────

    /// Set the selection to `id`. Unknown ids fail silently, leaving the
    /// current selection untouched. Returns `true` when the selection is now
    /// `id` (including re-selecting the already selected monitor).
    pub fn select(&mut self, id: MonitorId) -> bool {
        if self.get(id).is_none() {
            tracing::debug!(id, "ignoring selection of unknown monitor");
            return false;
        }
        self.selected = Some(id);
        true
    }

    /// Replace the entry with a matching id in place (list position
    /// preserved), or append when the id is unseen.
    pub fn upsert(&mut self, monitor: Monitor) {
        match self.monitors.iter_mut().find(|m| m.id == monitor.id) {
            Some(slot) => *slot = monitor,
            None => self.monitors.push(monitor),
        }
    }

    /// Delete the entry with `id`. When it was selected, the selection is
    /// cleared and the caller is told to clear the persisted value too.
    pub fn remove(&mut self, id: MonitorId) -> Removal {
        let before = self.monitors.len();
        self.monitors.retain(|m| m.id != id);
        let removed = self.monitors.len() < before;

        let selection_cleared = removed && self.selected == Some(id);
        if selection_cleared {
            self.selected = None;
        }

        Removal {
            removed,
            selection_cleared,
        }
    }

    /// Wholesale reload from the server list. A selection that still resolves
    /// survives; a stale one is dropped.
    pub fn replace_all(&mut self, monitors: Vec<Monitor>) {
        self.monitors = monitors;
        if let Some(id) = self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
    }

    /// Select the first monitor in list order, if any. Returns the new
    /// selection.
    pub fn select_first(&mut self) -> Option<MonitorId> {
        let first = self.monitors.first().map(|m| m.id);
        self.selected = first;
        first
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
