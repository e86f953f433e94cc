//! Periodic due-monitor evaluation.
//!
//! [`PollScheduler`] owns a cancellable tick (default period 1 s) and the
//! per-monitor in-flight set. Each tick the engine asks it which monitors are
//! due; elapsed time is measured against the most recent server-confirmed
//! `checked` timestamp, so repeated wall-clock subtraction cannot drift.
//! The timer runs only while at least one monitor exists; [`PollScheduler::sync`]
//! starts and stops it so no dangling timer survives an empty list or a
//! teardown.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use console_core::models::{Monitor, MonitorId};

/// Default evaluation period: one tick per second.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

/// Tick source plus in-flight bookkeeping for the poll loop.
#[derive(Debug)]
pub struct PollScheduler {
    period: Duration,
    interval: Option<Interval>,
    in_flight: HashSet<MonitorId>,
}

impl PollScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
            in_flight: HashSet::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Start or stop the timer to match the monitor count: running while the
    /// list is non-empty, cleared when it becomes empty.
    pub fn sync(&mut self, monitor_count: usize) {
        if monitor_count > 0 && self.interval.is_none() {
            // interval() would fire immediately; the first evaluation belongs
            // one full period after start.
            let mut interval = interval_at(Instant::now() + self.period, self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.interval = Some(interval);
            tracing::debug!(period = ?self.period, "poll scheduler started");
        } else if monitor_count == 0 && self.interval.is_some() {
            self.interval = None;
            tracing::debug!("poll scheduler stopped; no monitors remain");
        }
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Resolve on the next tick; pend forever while stopped so the engine's
    /// select loop simply never takes this branch.
    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    // ── Due evaluation ────────────────────────────────────────────────────

    /// Ids due for a refresh at `now`.
    ///
    /// A monitor is due when it is enabled, has a server-confirmed `checked`
    /// timestamp (never-checked monitors get their single eager refresh at
    /// initial load, not here), is not already in flight, and
    /// `now - checked >= interval`. A zero interval is invalid server data
    /// and is floored to one second. The whole list is evaluated
    /// synchronously within one call; nothing awaits.
    pub fn due(&self, monitors: &[Monitor], now: DateTime<Utc>) -> Vec<MonitorId> {
        monitors
            .iter()
            .filter(|m| m.enabled && !self.in_flight.contains(&m.id))
            .filter_map(|m| {
                let checked = m.checked?;
                let elapsed = now.signed_duration_since(checked).num_seconds();
                let interval = i64::from(m.interval.max(1));
                (elapsed >= interval).then_some(m.id)
            })
            .collect()
    }

    // ── In-flight bookkeeping ─────────────────────────────────────────────

    /// Mark `id` in flight. Returns `false` when a refresh for that id is
    /// already pending, in which case the caller must skip re-triggering it.
    pub fn begin(&mut self, id: MonitorId) -> bool {
        self.in_flight.insert(id)
    }

    /// Mark the refresh for `id` as completed.
    pub fn finish(&mut self, id: MonitorId) -> bool {
        self.in_flight.remove(&id)
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use console_core::models::{ConnectionType, NotificationConfig};

    fn monitor(id: MonitorId, interval: u32, checked: Option<DateTime<Utc>>) -> Monitor {
        Monitor {
            id,
            enabled: true,
            name: format!("monitor-{id}"),
            connection: "https://example.com".to_string(),
            connection_type: ConnectionType::Http,
            http_method: String::new(),
            interval,
            healthy: None,
            always_save: false,
            checked,
            result: String::new(),
            total_checks: 0,
            successful_checks: 0,
            headers: vec![],
            notification: NotificationConfig::Disabled,
            checks: vec![],
        }
    }

    // ── never-checked sentinel ────────────────────────────────────────────

    #[test]
    fn test_never_checked_monitor_is_never_due() {
        let scheduler = PollScheduler::default();
        let monitors = vec![monitor(1, 1, None)];

        // No matter how much time passes, elapsed time alone must not
        // trigger a monitor that has never been checked.
        let now = Utc::now();
        assert!(scheduler.due(&monitors, now).is_empty());
        assert!(scheduler
            .due(&monitors, now + ChronoDuration::hours(24))
            .is_empty());
    }

    // ── elapsed-based due rule ────────────────────────────────────────────

    #[test]
    fn test_due_exactly_once_past_interval() {
        let scheduler = PollScheduler::default();
        let now = Utc::now();
        let monitors = vec![monitor(1, 60, Some(now - ChronoDuration::seconds(61)))];

        assert_eq!(scheduler.due(&monitors, now), vec![1]);
    }

    #[test]
    fn test_not_due_before_interval() {
        let scheduler = PollScheduler::default();
        let now = Utc::now();
        let monitors = vec![monitor(1, 60, Some(now - ChronoDuration::seconds(59)))];

        assert!(scheduler.due(&monitors, now).is_empty());
    }

    #[test]
    fn test_due_at_exact_interval_boundary() {
        let scheduler = PollScheduler::default();
        let now = Utc::now();
        let monitors = vec![monitor(1, 30, Some(now - ChronoDuration::seconds(30)))];

        // "elapsed >= interval", not strictly greater.
        assert_eq!(scheduler.due(&monitors, now), vec![1]);
    }

    #[test]
    fn test_zero_interval_is_floored_to_one_second() {
        let scheduler = PollScheduler::default();
        let now = Utc::now();
        let monitors = vec![monitor(1, 0, Some(now))];

        // A record carrying interval 0 must not become due on the very tick
        // its check landed.
        assert!(scheduler.due(&monitors, now).is_empty());
        assert_eq!(
            scheduler.due(&monitors, now + ChronoDuration::seconds(1)),
            vec![1]
        );
    }

    #[test]
    fn test_disabled_monitor_is_never_due() {
        let scheduler = PollScheduler::default();
        let now = Utc::now();
        let mut m = monitor(1, 30, Some(now - ChronoDuration::seconds(300)));
        m.enabled = false;

        assert!(scheduler.due(&[m], now).is_empty());
    }

    #[test]
    fn test_due_evaluates_whole_list() {
        let scheduler = PollScheduler::default();
        let now = Utc::now();
        let monitors = vec![
            monitor(1, 30, Some(now - ChronoDuration::seconds(31))),
            monitor(2, 60, Some(now - ChronoDuration::seconds(10))),
            monitor(3, 10, Some(now - ChronoDuration::seconds(10))),
            monitor(4, 30, None),
        ];

        assert_eq!(scheduler.due(&monitors, now), vec![1, 3]);
    }

    // ── in-flight guard ───────────────────────────────────────────────────

    #[test]
    fn test_in_flight_monitor_is_skipped_on_later_ticks() {
        let mut scheduler = PollScheduler::default();
        let now = Utc::now();
        let monitors = vec![monitor(1, 30, Some(now - ChronoDuration::seconds(31)))];

        // First tick: due, refresh begins.
        assert_eq!(scheduler.due(&monitors, now), vec![1]);
        assert!(scheduler.begin(1));

        // Two more ticks before the refresh resolves: never re-triggered.
        assert!(scheduler
            .due(&monitors, now + ChronoDuration::seconds(1))
            .is_empty());
        assert!(scheduler
            .due(&monitors, now + ChronoDuration::seconds(2))
            .is_empty());
        assert_eq!(scheduler.in_flight_len(), 1);

        // Completion re-arms the monitor.
        assert!(scheduler.finish(1));
        assert_eq!(
            scheduler.due(&monitors, now + ChronoDuration::seconds(3)),
            vec![1]
        );
    }

    #[test]
    fn test_begin_rejects_duplicate() {
        let mut scheduler = PollScheduler::default();
        assert!(scheduler.begin(1));
        assert!(!scheduler.begin(1), "at most one in-flight refresh per id");
        assert!(scheduler.finish(1));
        assert!(!scheduler.finish(1));
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_sync_starts_and_stops_timer() {
        let mut scheduler = PollScheduler::default();
        assert!(!scheduler.is_running());

        scheduler.sync(2);
        assert!(scheduler.is_running());

        // Re-sync with a non-empty list does not restart the timer.
        scheduler.sync(3);
        assert!(scheduler.is_running());

        scheduler.sync(0);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_fires_once_per_period() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(1));
        scheduler.sync(1);

        // First tick lands one full period after start, not immediately.
        let before = tokio::time::Instant::now();
        scheduler.tick().await;
        assert!(before.elapsed() >= Duration::from_secs(1));

        let before = tokio::time::Instant::now();
        scheduler.tick().await;
        assert!(before.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_scheduler_never_ticks() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(1));
        scheduler.sync(0);

        let result =
            tokio::time::timeout(Duration::from_secs(3600), scheduler.tick()).await;
        assert!(result.is_err(), "a stopped scheduler must pend forever");
    }
}
