//! Normalized source records, sheet rows, and the per-customer row cap.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Source;

/// Maximum rows published per customer (Smartsheet dashboard limit).
pub const ROW_CAP: usize = 2_500;

// ============================================================================
// Records
// ============================================================================

/// An Opsgenie alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub customer: String,
    pub id: String,
    pub tiny_id: String,
    pub alias: String,
    pub message: String,
    pub status: String,
    pub acknowledged: bool,
    pub source: String,
    pub count: u64,
    pub priority: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// ServiceNow table a ticket came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketTable {
    Incident,
    RequestedItem,
    ChangeRequest,
}

impl TicketTable {
    /// Tables queried for every customer, in query order.
    pub const ALL: [TicketTable; 3] = [
        TicketTable::Incident,
        TicketTable::RequestedItem,
        TicketTable::ChangeRequest,
    ];

    /// Table name in the ServiceNow Table API.
    #[must_use]
    pub const fn api_name(self) -> &'static str {
        match self {
            Self::Incident => "incident",
            Self::RequestedItem => "sc_req_item",
            Self::ChangeRequest => "change_request",
        }
    }
}

/// A ServiceNow ticket with display values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub customer: String,
    pub table: TicketTable,
    pub number: String,
    pub location: String,
    pub configuration_item: String,
    pub short_description: String,
    pub state: String,
    pub category: String,
    pub priority: String,
    pub risk: String,
    pub assigned_to: String,
    pub opened_at: String,
    pub updated_by: String,
    pub closed_at: String,
}

impl TicketRecord {
    /// `opened_at` parsed from ServiceNow's display format.
    #[must_use]
    pub fn opened_at_time(&self) -> Option<NaiveDateTime> {
        parse_servicenow_datetime(&self.opened_at)
    }
}

/// Parse a ServiceNow display datetime (12h or 24h clock).
#[must_use]
pub fn parse_servicenow_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %I:%M:%S %p")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// A PRTG sensor currently in an alerting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorRecord {
    pub customer: String,
    /// Base URL of the PRTG server that reported the sensor.
    pub instance: String,
    pub object_id: Option<u64>,
    pub name: String,
    pub status: String,
    pub status_raw: i64,
    pub down_since: String,
    pub probe: String,
    pub group: String,
    pub device: String,
    pub message: String,
}

/// A record from any source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Record {
    Alert(AlertRecord),
    Ticket(TicketRecord),
    Sensor(SensorRecord),
}

impl Record {
    #[must_use]
    pub const fn source(&self) -> Source {
        match self {
            Self::Alert(_) => Source::Opsgenie,
            Self::Ticket(_) => Source::ServiceNow,
            Self::Sensor(_) => Source::Prtg,
        }
    }

    #[must_use]
    pub fn customer(&self) -> &str {
        match self {
            Self::Alert(alert) => &alert.customer,
            Self::Ticket(ticket) => &ticket.customer,
            Self::Sensor(sensor) => &sensor.customer,
        }
    }

    /// Flatten into the column layout of the record's sheet.
    #[must_use]
    pub fn to_row(&self) -> SheetRow {
        let cells = match self {
            Self::Alert(alert) => vec![
                alert.alias.clone(),
                alert.message.clone(),
                alert.id.clone(),
                alert.created_at.to_rfc3339(),
                python_bool(alert.acknowledged).to_string(),
                alert.status.clone(),
                alert.source.clone(),
                alert.count.to_string(),
                alert.priority.clone(),
            ],
            Self::Ticket(ticket) => vec![
                ticket.number.clone(),
                ticket.location.clone(),
                ticket.configuration_item.clone(),
                ticket.short_description.clone(),
                ticket.state.clone(),
                ticket.category.clone(),
                ticket.priority.clone(),
                ticket.risk.clone(),
                ticket.assigned_to.clone(),
                ticket.opened_at.clone(),
                ticket.updated_by.clone(),
                ticket.closed_at.clone(),
            ],
            Self::Sensor(sensor) => vec![
                sensor.status.clone(),
                sensor.down_since.clone(),
                sensor.name.clone(),
                format!("{} > {} > {}", sensor.probe, sensor.group, sensor.device),
                sensor.message.clone(),
            ],
        };
        SheetRow { cells }
    }
}

// Existing dashboards filter on the capitalized spelling.
const fn python_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One spreadsheet row; cells map to sheet columns by position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRow {
    pub cells: Vec<String>,
}

impl SheetRow {
    #[must_use]
    pub fn width(&self) -> usize {
        self.cells.len()
    }
}

/// A customer's records across all sources, capped.
///
/// Records are ordered by [`Source`] precedence, then by the order each
/// source produced them. When the cap is hit, later records are dropped.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    records: Vec<Record>,
    dropped: BTreeMap<Source, usize>,
}

impl RowSet {
    /// Merge `records` and truncate to `cap`.
    #[must_use]
    pub fn build(mut records: Vec<Record>, cap: usize) -> Self {
        // Stable: keeps each source's native order.
        records.sort_by_key(Record::source);

        let mut dropped = BTreeMap::new();
        if records.len() > cap {
            for record in &records[cap..] {
                *dropped.entry(record.source()).or_insert(0) += 1;
            }
            records.truncate(cap);
        }

        Self { records, dropped }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records cut by the cap.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.values().sum()
    }

    #[must_use]
    pub fn dropped_for(&self, source: Source) -> usize {
        self.dropped.get(&source).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn count_for(&self, source: Source) -> usize {
        self.records.iter().filter(|r| r.source() == source).count()
    }

    /// Rows destined for `source`'s sheet, in order.
    #[must_use]
    pub fn rows_for(&self, source: Source) -> Vec<SheetRow> {
        self.records
            .iter()
            .filter(|r| r.source() == source)
            .map(Record::to_row)
            .collect()
    }
}
