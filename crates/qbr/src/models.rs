//! Customer registry and run-scoped types.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Smartsheet sheet identifier.
pub type SheetId = u64;

// ============================================================================
// Sources
// ============================================================================

/// A data source feeding the report.
///
/// Variant order is the capping precedence: rows from earlier sources are
/// kept first when a customer exceeds the row cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Opsgenie,
    ServiceNow,
    Prtg,
}

impl Source {
    /// All sources in precedence order.
    pub const ALL: [Source; 3] = [Source::Opsgenie, Source::ServiceNow, Source::Prtg];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Opsgenie => "opsgenie",
            Self::ServiceNow => "servicenow",
            Self::Prtg => "prtg",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Customer
// ============================================================================

/// Destination sheets for one customer, one per source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTargets {
    #[serde(default)]
    pub opsgenie: Option<SheetId>,
    #[serde(default)]
    pub servicenow: Option<SheetId>,
    #[serde(default)]
    pub prtg: Option<SheetId>,
}

impl SheetTargets {
    /// Sheet that receives rows from `source`, if any.
    #[must_use]
    pub const fn for_source(&self, source: Source) -> Option<SheetId> {
        match source {
            Source::Opsgenie => self.opsgenie,
            Source::ServiceNow => self.servicenow,
            Source::Prtg => self.prtg,
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.opsgenie.is_none() && self.servicenow.is_none() && self.prtg.is_none()
    }
}

/// Credentials accepted by the PRTG HTTP API.
#[derive(Clone, PartialEq, Eq)]
pub enum PrtgCredentials {
    /// API token (`apitoken` parameter).
    ApiToken(String),
    /// Legacy user account with a passhash.
    Passhash { username: String, passhash: String },
}

impl PrtgCredentials {
    /// Query parameters that authenticate a request.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::ApiToken(token) => vec![("apitoken", token.as_str())],
            Self::Passhash { username, passhash } => {
                vec![("username", username.as_str()), ("passhash", passhash.as_str())]
            }
        }
    }
}

impl std::fmt::Debug for PrtgCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiToken(_) => f.write_str("ApiToken(<redacted>)"),
            Self::Passhash { username, .. } => f
                .debug_struct("Passhash")
                .field("username", username)
                .field("passhash", &"<redacted>")
                .finish(),
        }
    }
}

/// One PRTG core server monitoring (part of) a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrtgInstance {
    pub url: Url,
    pub credentials: PrtgCredentials,
}

/// A customer in the report registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    /// Display name, unique within the registry.
    pub name: String,
    /// Company names the customer goes by in ServiceNow.
    pub servicenow_aliases: Vec<String>,
    /// Tag carried by the customer's Opsgenie alerts.
    pub opsgenie_tag: Option<String>,
    pub prtg_instances: Vec<PrtgInstance>,
    /// Substrings matched against PRTG probe names.
    pub prtg_probe_substrings: Vec<String>,
    pub sheets: SheetTargets,
}

impl Customer {
    /// Whether the customer has both identifiers and a sheet for `source`.
    #[must_use]
    pub fn wants(&self, source: Source) -> bool {
        let identified = match source {
            Source::Opsgenie => self.opsgenie_tag.is_some(),
            Source::ServiceNow => !self.servicenow_aliases.is_empty(),
            Source::Prtg => !self.prtg_instances.is_empty(),
        };
        identified && self.sheets.for_source(source).is_some()
    }
}

// ============================================================================
// Report window
// ============================================================================

/// Half-open UTC range `[start, end)` of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    /// The `days` days ending at `now`. Saturates at the earliest
    /// representable instant.
    #[must_use]
    pub fn trailing_days(now: DateTime<Utc>, days: u32) -> Self {
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| now.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end: now }
    }

    /// The calendar quarter containing `now`.
    #[must_use]
    pub fn calendar_quarter(now: DateTime<Utc>) -> Option<Self> {
        let first_month = (now.month0() / 3) * 3 + 1;
        let (next_year, next_month) = if first_month == 10 {
            (now.year() + 1, 1)
        } else {
            (now.year(), first_month + 3)
        };

        Some(Self {
            start: month_start(now.year(), first_month)?,
            end: month_start(next_year, next_month)?,
        })
    }

    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

fn month_start(year: i32, month: u32) -> Option<DateTime<Utc>> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// How the report window is derived from the run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    Trailing { days: u32 },
    CalendarQuarter,
}

impl Default for WindowMode {
    fn default() -> Self {
        Self::Trailing { days: 90 }
    }
}

impl WindowMode {
    #[must_use]
    pub fn resolve(self, now: DateTime<Utc>) -> ReportWindow {
        match self {
            Self::Trailing { days } => ReportWindow::trailing_days(now, days),
            Self::CalendarQuarter => ReportWindow::calendar_quarter(now)
                .unwrap_or_else(|| ReportWindow::trailing_days(now, 90)),
        }
    }
}
