//! Runtime layer for the uptime console.
//!
//! Owns monitor state and selection, schedules elapsed-time polling, and
//! reconciles server responses, all inside one engine task that consumers
//! drive through commands and observe through snapshot events.

pub mod engine;
pub mod refresh;
pub mod scheduler;
pub mod store;

pub use engine::{Engine, EngineCommand, EngineEvent, EngineHandle, StoreSnapshot};
pub use refresh::{Applied, RefreshOutcome, RefreshService};
pub use scheduler::{PollScheduler, DEFAULT_TICK_PERIOD};
pub use store::{MonitorStore, Removal};
