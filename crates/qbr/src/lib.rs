//! Quarterly business report sync.
//!
//! Pulls each customer's Opsgenie alerts, ServiceNow tickets, and alerting
//! PRTG sensors, caps the combined rows, and replaces the contents of the
//! customer's Smartsheet sheets.
//!
//! # Architecture
//!
//! ```text
//! Config ──► Runner ──► Collector (Opsgenie, ServiceNow, PRTG)
//!                 │
//!                 ├──► RowSet (merge + cap)
//!                 │
//!                 └──► Publisher (Smartsheet)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use qbr::{Config, Runner};
//!
//! let config = Config::from_env(None)?;
//! let runner = Runner::new(config.window.resolve(chrono::Utc::now()), config.row_cap);
//! let report = runner.run(&config.customers).await;
//! ```

pub mod config;
pub mod http;
pub mod logging;
pub mod models;
pub mod records;
pub mod runner;
pub mod smartsheet;
pub mod sources;

pub use config::{Config, ConfigError};
pub use models::{Customer, ReportWindow, SheetTargets, Source, WindowMode};
pub use records::{Record, RowSet, SheetRow, ROW_CAP};
pub use runner::{CustomerReport, RunReport, Runner, SourceReport};
pub use smartsheet::{PublishError, Publisher, SmartsheetClient};
pub use sources::{Collector, OpsgenieCollector, PrtgCollector, ServiceNowCollector, SourceError};
