//! ServiceNow Table API collector.
//!
//! Queries the `incident`, `sc_req_item` and `change_request` tables for
//! each company alias of a customer and merges the results.
//!
//! ## Authentication
//!
//! Basic auth with an integration user that can read the three tables.

mod client;
mod models;

pub use client::{ServiceNowCollector, PAGE_LIMIT};
pub use models::*;
