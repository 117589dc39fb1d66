//! Smartsheet API models.

use serde::{Deserialize, Serialize};

use crate::models::SheetId;

/// A sheet as returned by `GET /sheets/{id}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub rows: Vec<RowRef>,
}

impl Sheet {
    /// Column IDs ordered by column index.
    #[must_use]
    pub fn column_ids(&self) -> Vec<u64> {
        let mut columns: Vec<&Column> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.index);
        columns.into_iter().map(|c| c.id).collect()
    }

    /// IDs of every existing row.
    #[must_use]
    pub fn row_ids(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.id).collect()
    }
}

/// A sheet column.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: u64,
    #[serde(default)]
    pub index: u32,
}

/// An existing row; cells are not needed to clear a sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct RowRef {
    pub id: u64,
}

// ============================================================================
// Requests
// ============================================================================

/// A row to add.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRow {
    pub to_bottom: bool,
    pub cells: Vec<NewCell>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCell {
    pub column_id: u64,
    pub value: String,
}

// ============================================================================
// Responses
// ============================================================================

/// Envelope of write operations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub message: String,
    #[serde(default)]
    pub result_code: i64,
}

impl OperationResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.message == "SUCCESS"
    }
}
