//! Smartsheet API client.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::models::{NewCell, NewRow, OperationResult, Sheet};
use super::{PublishError, PublishOutcome, Publisher};
use crate::http::{self, error_message};
use crate::models::SheetId;
use crate::records::SheetRow;

/// Smartsheet API base URL.
pub const SMARTSHEET_API_BASE: &str = "https://api.smartsheet.com/2.0";

/// Row IDs per delete request (URL length bound).
pub const DELETE_CHUNK: usize = 100;

/// Rows per add request.
pub const ADD_CHUNK: usize = 500;

/// Smartsheet API client.
#[derive(Debug, Clone)]
pub struct SmartsheetClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SmartsheetClient {
    /// Create a new Smartsheet client.
    ///
    /// # Errors
    ///
    /// Returns an error if the access token is empty or the HTTP client fails to build.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(PublishError::Config(
                "Smartsheet access token is required".to_string(),
            ));
        }

        Ok(Self {
            client: http::client(timeout)?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PublishError> {
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Api {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(PublishError::Serialization)
    }

    fn check(result: OperationResult) -> Result<(), PublishError> {
        if result.is_success() {
            Ok(())
        } else {
            Err(PublishError::NotSuccess {
                message: result.message,
                result_code: result.result_code,
            })
        }
    }

    /// Fetch a sheet with its columns and row IDs.
    pub async fn get_sheet(&self, sheet_id: SheetId) -> Result<Sheet, PublishError> {
        let url = format!("{}/sheets/{sheet_id}", self.base_url);
        debug!(url = %url, "Making Smartsheet API request");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Delete rows by ID. Callers chunk to [`DELETE_CHUNK`].
    pub async fn delete_rows(&self, sheet_id: SheetId, row_ids: &[u64]) -> Result<(), PublishError> {
        let url = format!("{}/sheets/{sheet_id}/rows", self.base_url);
        let ids = row_ids
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        debug!(url = %url, count = row_ids.len(), "Deleting Smartsheet rows");

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .query(&[("ids", ids.as_str()), ("ignoreRowsNotFound", "true")])
            .send()
            .await?;
        Self::check(Self::parse(response).await?)
    }

    /// Append rows to the bottom of the sheet. Callers chunk to [`ADD_CHUNK`].
    pub async fn add_rows(&self, sheet_id: SheetId, rows: &[NewRow]) -> Result<(), PublishError> {
        let url = format!("{}/sheets/{sheet_id}/rows", self.base_url);
        debug!(url = %url, count = rows.len(), "Adding Smartsheet rows");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(rows)
            .send()
            .await?;
        Self::check(Self::parse(response).await?)
    }
}

/// Map row cells onto sheet columns by position.
pub(crate) fn to_new_rows(
    sheet_id: SheetId,
    column_ids: &[u64],
    rows: &[SheetRow],
) -> Result<Vec<NewRow>, PublishError> {
    let width = rows.iter().map(SheetRow::width).max().unwrap_or(0);
    if width > column_ids.len() {
        return Err(PublishError::ColumnMismatch {
            sheet_id,
            columns: column_ids.len(),
            width,
        });
    }

    Ok(rows
        .iter()
        .map(|row| NewRow {
            to_bottom: true,
            cells: column_ids
                .iter()
                .zip(&row.cells)
                .map(|(column_id, value)| NewCell {
                    column_id: *column_id,
                    value: value.clone(),
                })
                .collect(),
        })
        .collect())
}

#[async_trait]
impl Publisher for SmartsheetClient {
    #[instrument(skip(self, rows), fields(rows = rows.len()))]
    async fn replace_rows(
        &self,
        sheet_id: SheetId,
        rows: &[SheetRow],
    ) -> Result<PublishOutcome, PublishError> {
        let sheet = self.get_sheet(sheet_id).await?;
        // Validate before deleting anything.
        let new_rows = to_new_rows(sheet_id, &sheet.column_ids(), rows)?;

        let existing = sheet.row_ids();
        for chunk in existing.chunks(DELETE_CHUNK) {
            self.delete_rows(sheet_id, chunk).await?;
        }
        debug!(sheet = %sheet.name, cleared = existing.len(), "Sheet cleared");

        for chunk in new_rows.chunks(ADD_CHUNK) {
            self.add_rows(sheet_id, chunk).await?;
        }

        info!(
            sheet = %sheet.name,
            cleared = existing.len(),
            added = new_rows.len(),
            "Sheet published"
        );
        Ok(PublishOutcome {
            sheet_name: sheet.name,
            cleared: existing.len(),
            added: new_rows.len(),
        })
    }
}
