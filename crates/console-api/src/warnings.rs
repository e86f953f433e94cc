//! De-duplication of transient warning messages.
//!
//! Repeated failures (an unreachable server, the same 500 every tick) would
//! otherwise emit an identical warning once per second. [`WarningGate`]
//! suppresses consecutive duplicates for a cooldown window; a different
//! message always passes and re-arms the gate.

use std::time::{Duration, Instant};

/// Default suppression window for repeated identical warnings.
pub const DEFAULT_WARNING_COOLDOWN: Duration = Duration::from_secs(5);

/// Cooldown-based duplicate filter for user-facing warnings.
#[derive(Debug)]
pub struct WarningGate {
    cooldown: Duration,
    last: Option<(String, Instant)>,
}

impl WarningGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last: None,
        }
    }

    /// Return `true` when `message` should be surfaced to the user.
    ///
    /// An admitted message arms the gate: the same text is suppressed until
    /// the cooldown elapses. Any different message passes immediately.
    pub fn admit(&mut self, message: &str) -> bool {
        if let Some((last_message, at)) = &self.last {
            if last_message == message && at.elapsed() < self.cooldown {
                return false;
            }
        }

        self.last = Some((message.to_string(), Instant::now()));
        true
    }
}

impl Default for WarningGate {
    fn default() -> Self {
        Self::new(DEFAULT_WARNING_COOLDOWN)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
