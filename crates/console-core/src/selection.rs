//! Persisted "last selected monitor" record.
//!
//! One scoped key surviving reloads: the id of the monitor the user last
//! selected, stored as JSON at `~/.uptime-console/last_selection.json`.
//! Absent, unparseable, or stale values are all treated as "no prior
//! selection"; the value persists until explicitly cleared or overwritten.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::MonitorId;

/// Persisted last-selection state.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LastSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitor_id: Option<MonitorId>,
}

impl LastSelection {
    /// Return the default path to the persisted selection file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the selection path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".uptime-console").join("last_selection.json")
    }

    /// Load the persisted selection from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load the persisted selection from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write the selection to the default path.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write the selection to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the default selection file if it exists.
    pub fn clear() -> Result<(), std::io::Error> {
        Self::clear_at(&Self::config_path())
    }

    /// Delete the selection file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Persist `id` as the last selection, logging (not propagating) failures.
    /// Selection persistence is best-effort; a failed write must never stall
    /// the runtime.
    pub fn remember(id: MonitorId, path: &Path) {
        let record = LastSelection {
            monitor_id: Some(id),
        };
        if let Err(e) = record.save_to(path) {
            tracing::warn!(error = %e, id, "failed to persist monitor selection");
        }
    }

    /// Remove any persisted selection, logging (not propagating) failures.
    pub fn forget(path: &Path) {
        if let Err(e) = Self::clear_at(path) {
            tracing::warn!(error = %e, "failed to clear persisted monitor selection");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_path(tmp: &TempDir) -> PathBuf {
        LastSelection::config_path_in(tmp.path())
    }

    // ── save / load round trip ────────────────────────────────────────────

    #[test]
    fn test_save_load_round_trip() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_path(&tmp);

        let record = LastSelection {
            monitor_id: Some(17),
        };
        record.save_to(&path).expect("save");

        let loaded = LastSelection::load_from(&path);
        assert_eq!(loaded.monitor_id, Some(17));
    }

    // ── default when missing or corrupt ───────────────────────────────────

    #[test]
    fn test_load_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastSelection::load_from(&tmp_path(&tmp));
        assert!(loaded.monitor_id.is_none());
    }

    #[test]
    fn test_load_default_when_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json at all").unwrap();

        let loaded = LastSelection::load_from(&path);
        assert!(loaded.monitor_id.is_none());
    }

    // ── clear ─────────────────────────────────────────────────────────────

    #[test]
    fn test_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_path(&tmp);

        LastSelection { monitor_id: Some(3) }
            .save_to(&path)
            .expect("save");
        assert!(path.exists());

        LastSelection::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_on_missing_file_is_ok() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(LastSelection::clear_at(&tmp_path(&tmp)).is_ok());
    }

    // ── remember / forget helpers ─────────────────────────────────────────

    #[test]
    fn test_remember_overwrites_previous_value() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_path(&tmp);

        LastSelection::remember(1, &path);
        LastSelection::remember(2, &path);

        assert_eq!(LastSelection::load_from(&path).monitor_id, Some(2));
    }

    #[test]
    fn test_forget_then_load_is_default() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_path(&tmp);

        LastSelection::remember(9, &path);
        LastSelection::forget(&path);

        assert!(LastSelection::load_from(&path).monitor_id.is_none());
    }
}
