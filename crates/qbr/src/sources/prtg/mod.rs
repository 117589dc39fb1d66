//! PRTG Network Monitor collector.
//!
//! Reads the sensors table of each configured PRTG core server and keeps
//! the sensors in an alerting state.
//!
//! ## Authentication
//!
//! Per instance: an API token, or a username with its passhash.

mod client;
mod models;

pub use client::{PrtgCollector, MAX_SENSORS};
pub use models::*;
