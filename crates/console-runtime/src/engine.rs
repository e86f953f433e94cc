//! Single-owner runtime loop.
//!
//! [`Engine::start`] spawns one tokio task that owns the [`MonitorStore`],
//! the [`PollScheduler`], and the selection persistence, so every state
//! update is serialized without locks: commands arrive on one channel,
//! refresh completions on another, and consumers observe state through
//! [`EngineEvent`] snapshots on a third. Refresh fetches are fire-and-forget
//! tasks; a completion that arrives after teardown lands in a closed channel
//! and is discarded, never written into a torn-down store.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use console_api::{ApiClient, WarningGate};
use console_core::models::{Monitor, MonitorForm, MonitorId};
use console_core::selection::LastSelection;

use crate::refresh::{Applied, RefreshOutcome, RefreshService};
use crate::scheduler::PollScheduler;
use crate::store::MonitorStore;

// ── Public types ──────────────────────────────────────────────────────────────

/// Operations a consumer can ask the engine to perform.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Select a monitor by id; unknown ids are ignored silently.
    Select(MonitorId),
    /// Create a monitor and select the server's record for it.
    Create(MonitorForm),
    /// Update a monitor in place; identity is the id, so renames are safe.
    Update(MonitorId, MonitorForm),
    /// Delete a monitor.
    Delete(MonitorId),
    /// Force an immediate out-of-cycle check on the server.
    RunNow(MonitorId),
    /// Refresh a single monitor now, subject to the in-flight guard.
    Refresh(MonitorId),
}

/// Immutable view of the store after a mutation.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Monitors in stable server-list order.
    pub monitors: Vec<Monitor>,
    /// Currently selected monitor id, if any.
    pub selected: Option<MonitorId>,
}

/// Everything the engine reports outward.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// Fresh state after a mutation; the consumer re-renders from this.
    Snapshot(StoreSnapshot),
    /// Transient, de-duplicated warning text.
    Warning(String),
}

/// Handle to a running engine: command entry point plus teardown.
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    handle: tokio::task::JoinHandle<()>,
}

impl EngineHandle {
    /// Queue a command. Returns `false` when the engine has already stopped.
    pub async fn send(&self, command: EngineCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    /// A cloneable command sender for wiring into other components.
    pub fn commands(&self) -> mpsc::Sender<EngineCommand> {
        self.commands.clone()
    }

    /// Tear the engine down immediately. In-flight refreshes are allowed to
    /// finish; their results go into a closed channel and are dropped.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// The runtime loop's owned state. Constructed and consumed by
/// [`Engine::start`]; nothing outside the task ever touches it.
pub struct Engine {
    client: Arc<ApiClient>,
    refresh: RefreshService,
    store: MonitorStore,
    scheduler: PollScheduler,
    /// Ids whose post-update refetch is waiting for an in-flight refresh.
    pending_refetch: HashSet<MonitorId>,
    warnings: WarningGate,
    selection_path: PathBuf,
    events: mpsc::Sender<EngineEvent>,
    outcome_tx: mpsc::Sender<RefreshOutcome>,
}

/// What one iteration of the select loop produced.
enum Step {
    Tick,
    Command(Option<EngineCommand>),
    Outcome(RefreshOutcome),
}

impl Engine {
    /// Spin up the engine task.
    ///
    /// Returns the event receiver for the consumer to poll and a handle for
    /// commands and teardown.
    pub fn start(
        client: ApiClient,
        selection_path: PathBuf,
        period: Duration,
    ) -> (mpsc::Receiver<EngineEvent>, EngineHandle) {
        // Modest buffers: slow consumers back-pressure the loop instead of
        // piling up unbounded snapshots.
        let (event_tx, event_rx) = mpsc::channel(16);
        let (command_tx, command_rx) = mpsc::channel(16);
        let (outcome_tx, outcome_rx) = mpsc::channel(32);

        let client = Arc::new(client);
        let engine = Engine {
            refresh: RefreshService::new(Arc::clone(&client)),
            client,
            store: MonitorStore::new(),
            scheduler: PollScheduler::new(period),
            pending_refetch: HashSet::new(),
            warnings: WarningGate::default(),
            selection_path,
            events: event_tx,
            outcome_tx,
        };

        let handle = tokio::spawn(engine.run(command_rx, outcome_rx));

        (
            event_rx,
            EngineHandle {
                commands: command_tx,
                handle,
            },
        )
    }

    // ── Main loop ─────────────────────────────────────────────────────────

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<EngineCommand>,
        mut outcomes: mpsc::Receiver<RefreshOutcome>,
    ) {
        self.initial_load().await;

        loop {
            if self.events.is_closed() {
                tracing::debug!("event receiver dropped; engine loop exiting");
                break;
            }

            let step = tokio::select! {
                _ = self.scheduler.tick() => Step::Tick,
                command = commands.recv() => Step::Command(command),
                // The engine holds its own outcome sender, so this branch
                // never yields None.
                Some(outcome) = outcomes.recv() => Step::Outcome(outcome),
            };

            match step {
                Step::Tick => self.on_tick(),
                Step::Command(Some(command)) => self.handle_command(command).await,
                Step::Command(None) => {
                    tracing::debug!("command sender dropped; engine loop exiting");
                    break;
                }
                Step::Outcome(outcome) => self.on_outcome(outcome).await,
            }
        }
    }

    /// Fetch the full monitor list, resolve the persisted selection, and
    /// issue the one-time eager refreshes.
    async fn initial_load(&mut self) {
        match self.client.list_monitors().await {
            Ok(monitors) => {
                tracing::info!(count = monitors.len(), "loaded monitor list");
                self.store.replace_all(monitors);

                match LastSelection::load_from(&self.selection_path).monitor_id {
                    Some(id) if self.store.select(id) => {
                        tracing::debug!(id, "restored persisted selection");
                    }
                    Some(id) => {
                        // The stored id no longer resolves: drop the stale
                        // reference and fall back to the first monitor.
                        tracing::debug!(id, "persisted selection is stale; clearing");
                        LastSelection::forget(&self.selection_path);
                        self.store.select_first();
                    }
                    None => {
                        self.store.select_first();
                    }
                }

                // The selected monitor and anything never checked get one
                // eager refresh now; elapsed-time polling permanently ignores
                // the never-checked sentinel.
                let mut eager: Vec<MonitorId> = Vec::new();
                if let Some(id) = self.store.selected_id() {
                    eager.push(id);
                }
                for monitor in self.store.list() {
                    if monitor.never_checked() && !eager.contains(&monitor.id) {
                        eager.push(monitor.id);
                    }
                }

                self.scheduler.sync(self.store.len());
                self.emit_snapshot().await;

                for id in eager {
                    self.spawn_refresh(id);
                }
            }
            Err(e) => {
                // Start empty but interactive; a later Refresh/Create still
                // works and the warning tells the user why the list is bare.
                tracing::warn!(error = %e, "initial monitor list fetch failed");
                self.warn(e.to_string()).await;
            }
        }
    }

    // ── Tick handling ─────────────────────────────────────────────────────

    /// Evaluate every monitor once, synchronously, and fire refreshes for the
    /// due ones. Fetches are fire-and-forget: a slow response never delays
    /// evaluation of the rest of the list.
    fn on_tick(&mut self) {
        let now = Utc::now();
        for id in self.scheduler.due(self.store.list(), now) {
            self.spawn_refresh(id);
        }
    }

    fn spawn_refresh(&mut self, id: MonitorId) {
        if !self.scheduler.begin(id) {
            tracing::debug!(id, "refresh already in flight; skipping");
            return;
        }
        self.spawn_fetch(id);
    }

    fn spawn_fetch(&mut self, id: MonitorId) {
        let service = self.refresh.clone();
        let outcomes = self.outcome_tx.clone();
        tokio::spawn(async move {
            let outcome = service.fetch(id).await;
            // A closed channel means the engine is gone; discard the result.
            let _ = outcomes.send(outcome).await;
        });
    }

    /// Fetch the authoritative record after a successful PUT. A refresh
    /// already in flight for the same id may carry a response that predates
    /// the update, so the fetch is deferred until that one completes rather
    /// than skipped.
    fn refetch_updated(&mut self, id: MonitorId) {
        if self.scheduler.begin(id) {
            self.spawn_fetch(id);
        } else {
            tracing::debug!(id, "refresh in flight; deferring post-update fetch");
            self.pending_refetch.insert(id);
        }
    }

    // ── Completion handling ───────────────────────────────────────────────

    async fn on_outcome(&mut self, outcome: RefreshOutcome) {
        let id = outcome.id();
        self.scheduler.finish(id);
        self.apply_outcome(outcome).await;

        // A post-update fetch deferred behind this completion runs now,
        // unless the monitor disappeared in the meantime.
        if self.pending_refetch.remove(&id) && self.store.get(id).is_some() {
            self.spawn_refresh(id);
        }
    }

    async fn apply_outcome(&mut self, outcome: RefreshOutcome) {
        match RefreshService::apply(outcome, &mut self.store) {
            Applied::Replaced(_) => self.emit_snapshot().await,
            Applied::Discarded(_) => {}
            Applied::DroppedStale {
                selection_cleared, ..
            } => {
                if selection_cleared {
                    LastSelection::forget(&self.selection_path);
                    self.store.select_first();
                }
                self.scheduler.sync(self.store.len());
                self.emit_snapshot().await;
            }
            Applied::Failed { warning, .. } => self.warn(warning).await,
        }
    }

    // ── Command handling ──────────────────────────────────────────────────

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Select(id) => {
                if self.store.select(id) {
                    // Every explicit user selection overwrites the stored
                    // value.
                    LastSelection::remember(id, &self.selection_path);
                    self.emit_snapshot().await;
                }
            }

            EngineCommand::Create(form) => {
                if let Err(message) = form.validate() {
                    self.warn(message).await;
                    return;
                }
                match self.client.create_monitor(&form).await {
                    Ok(monitor) => {
                        let id = monitor.id;
                        let never_checked = monitor.never_checked();
                        self.store.upsert(monitor);
                        self.store.select(id);
                        LastSelection::remember(id, &self.selection_path);
                        self.scheduler.sync(self.store.len());
                        self.emit_snapshot().await;
                        // A brand-new monitor has no check yet; give it its
                        // single eager refresh.
                        if never_checked {
                            self.spawn_refresh(id);
                        }
                    }
                    Err(e) => self.warn(e.to_string()).await,
                }
            }

            EngineCommand::Update(id, form) => {
                if let Err(message) = form.validate() {
                    self.warn(message).await;
                    return;
                }
                match self.client.update_monitor(id, &form).await {
                    // The PUT returns no body; fetch the authoritative record.
                    Ok(()) => self.refetch_updated(id),
                    Err(e) => self.warn(e.to_string()).await,
                }
            }

            EngineCommand::Delete(id) => match self.client.delete_monitor(id).await {
                Ok(()) => {
                    let removal = self.store.remove(id);
                    if removal.selection_cleared {
                        LastSelection::forget(&self.selection_path);
                    }
                    self.scheduler.sync(self.store.len());
                    self.emit_snapshot().await;
                }
                Err(e) => self.warn(e.to_string()).await,
            },

            EngineCommand::RunNow(id) => {
                // The run endpoint returns the freshly checked record, which
                // reconciles exactly like a refresh completion. The in-flight
                // set is untouched: this is an out-of-cycle check and any
                // scheduled refresh for the same id stays accounted for.
                let outcome = match self.client.run_monitor(id).await {
                    Ok(monitor) => RefreshOutcome::Replaced(Box::new(monitor)),
                    Err(error) => RefreshOutcome::Failed { id, error },
                };
                self.apply_outcome(outcome).await;
            }

            EngineCommand::Refresh(id) => self.spawn_refresh(id),
        }
    }

    // ── Outbound events ───────────────────────────────────────────────────

    async fn emit_snapshot(&mut self) {
        let snapshot = StoreSnapshot {
            monitors: self.store.list().to_vec(),
            selected: self.store.selected_id(),
        };
        if self
            .events
            .send(EngineEvent::Snapshot(snapshot))
            .await
            .is_err()
        {
            tracing::debug!("event receiver dropped; snapshot discarded");
        }
    }

    async fn warn(&mut self, message: String) {
        if !self.warnings.admit(&message) {
            return;
        }
        tracing::warn!(%message, "surfacing transient warning");
        let _ = self.events.send(EngineEvent::Warning(message)).await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
