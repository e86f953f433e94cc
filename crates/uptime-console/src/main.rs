mod bootstrap;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use console_api::ApiClient;
use console_core::models::Health;
use console_core::selection::LastSelection;
use console_core::settings::Settings;
use console_runtime::{Engine, EngineCommand, EngineEvent, StoreSnapshot};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(settings.effective_log_level(), settings.log_file.as_ref())?;

    tracing::info!("uptime-console v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(server = %settings.server_url, period_secs = settings.poll_period_secs);

    if settings.clear {
        LastSelection::clear()?;
        tracing::info!("cleared persisted monitor selection");
    }

    let client = ApiClient::new(&settings.server_url)?;
    let period = Duration::from_secs(settings.poll_period_secs);

    let (mut events, handle) = Engine::start(client, LastSelection::config_path(), period);

    // An explicit --select overrides whatever the engine restored from disk.
    if let Some(id) = settings.select {
        handle.send(EngineCommand::Select(id)).await;
    }

    // Render engine events until the receiver side is torn down. Ctrl+C at
    // the OS level stops the engine task cleanly.
    tokio::select! {
        () = consume_events(&mut events) => {
            handle.abort();
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received; shutting down engine task");
            handle.abort();
        }
    }

    Ok(())
}

/// Print every state snapshot and surfaced warning until the engine stops.
async fn consume_events(events: &mut tokio::sync::mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Snapshot(snapshot) => render(&snapshot),
            EngineEvent::Warning(message) => eprintln!("warning: {message}"),
        }
    }
}

/// One line per monitor, selection marked with `>`.
fn render(snapshot: &StoreSnapshot) {
    for monitor in &snapshot.monitors {
        let marker = if snapshot.selected == Some(monitor.id) {
            '>'
        } else {
            ' '
        };
        let health = match monitor.health() {
            Health::Healthy => "up",
            Health::Unhealthy => "DOWN",
            Health::Unknown => "?",
        };
        let checked = monitor
            .checked
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        let rate = monitor
            .success_rate()
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{marker} [{:>4}] {:5} {:<24} interval {:>4}s  checked {checked}  ok {rate}  {}",
            monitor.id, health, monitor.name, monitor.interval, monitor.result
        );
    }
}
