//! Smartsheet publisher.
//!
//! Each customer sheet is treated as a table: every publish clears the sheet
//! and writes the new snapshot of rows.
//!
//! ## Authentication
//!
//! Bearer access token (`SMARTSHEET_API_KEY`).

mod client;
mod models;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::SheetId;
use crate::records::SheetRow;

pub use client::{SmartsheetClient, ADD_CHUNK, DELETE_CHUNK, SMARTSHEET_API_BASE};
pub use models::*;

/// Errors that can occur while publishing to a sheet.
#[derive(Error, Debug)]
pub enum PublishError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The API answered but did not report success.
    #[error("Smartsheet returned {message} (result code {result_code})")]
    NotSuccess { message: String, result_code: i64 },

    /// Rows carry more cells than the sheet has columns.
    #[error("Sheet {sheet_id} has {columns} column(s) but rows need {width}")]
    ColumnMismatch {
        sheet_id: SheetId,
        columns: usize,
        width: usize,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What a publish did to one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOutcome {
    pub sheet_name: String,
    /// Rows deleted before writing.
    pub cleared: usize,
    /// Rows written.
    pub added: usize,
}

/// A destination that stores one sheet's rows.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Replace every row of `sheet_id` with `rows`, keeping their order.
    async fn replace_rows(
        &self,
        sheet_id: SheetId,
        rows: &[SheetRow],
    ) -> Result<PublishOutcome, PublishError>;
}
