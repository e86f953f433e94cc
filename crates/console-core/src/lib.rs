//! Core domain layer for the uptime console.
//!
//! Wire models for monitors and checks, the error taxonomy, CLI settings,
//! and the persisted last-selection record.

pub mod error;
pub mod models;
pub mod selection;
pub mod settings;

pub use error::{ConsoleError, Result};
