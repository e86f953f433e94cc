//! HTTP API layer for the uptime console.
//!
//! [`client::ApiClient`] talks to the monitoring server's JSON endpoints;
//! [`warnings::WarningGate`] de-duplicates the transient warnings its
//! failures produce.

pub mod client;
pub mod warnings;

pub use client::ApiClient;
pub use warnings::{WarningGate, DEFAULT_WARNING_COOLDOWN};
