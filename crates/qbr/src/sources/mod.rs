//! Read-only source collectors.
//!
//! This module provides integrations with:
//!
//! - Opsgenie - Alert API (alerts tagged per customer)
//! - ServiceNow - Table API (incidents, requested items, change requests)
//! - PRTG - table API (sensors currently alerting)

pub mod opsgenie;
pub mod prtg;
pub mod servicenow;
mod traits;

pub use opsgenie::OpsgenieCollector;
pub use prtg::PrtgCollector;
pub use servicenow::ServiceNowCollector;
pub use traits::{Collector, SourceError};
