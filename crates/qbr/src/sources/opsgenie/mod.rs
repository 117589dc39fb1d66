//! Opsgenie Alert API collector.
//!
//! Lists alerts carrying the customer's tag that were created inside the
//! report window.
//!
//! ## Authentication
//!
//! Requires an API integration key with read access, sent as
//! `Authorization: GenieKey <key>`.

mod client;
mod models;

pub use client::{OpsgenieCollector, MAX_OFFSET, OPSGENIE_API_BASE, PAGE_LIMIT};
pub use models::*;
