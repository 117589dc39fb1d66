//! Job configuration.
//!
//! Everything is read once at startup from a key lookup (the process
//! environment in production) plus a customer registry, then validated
//! before any API is contacted.

use std::collections::HashSet;
use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::models::{
    Customer, PrtgCredentials, PrtgInstance, SheetId, SheetTargets, Source, WindowMode,
};
use crate::records::ROW_CAP;
use crate::smartsheet::SMARTSHEET_API_BASE;
use crate::sources::opsgenie::OPSGENIE_API_BASE;
use crate::sources::ServiceNowCollector;

/// Default per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default trailing window length.
pub const DEFAULT_WINDOW_DAYS: u32 = 90;

/// Longest accepted trailing window, roughly ten years.
pub const MAX_WINDOW_DAYS: u32 = 3660;

/// Errors that make the job refuse to start.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Failed to read customer file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse customers from {origin}: {message}")]
    Parse { origin: String, message: String },

    #[error("No customers configured")]
    NoCustomers,

    #[error("Duplicate customer name: {0}")]
    DuplicateCustomer(String),

    #[error("Customer {customer}: {message}")]
    Customer { customer: String, message: String },
}

/// A credential that is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct OpsgenieSettings {
    pub api_key: Secret,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct ServiceNowSettings {
    pub instance_url: String,
    pub username: String,
    pub password: Secret,
}

#[derive(Debug, Clone)]
pub struct SmartsheetSettings {
    pub api_key: Secret,
    pub base_url: String,
}

/// Validated job configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Present when some customer is collected from Opsgenie.
    pub opsgenie: Option<OpsgenieSettings>,
    /// Present when some customer is collected from ServiceNow.
    pub servicenow: Option<ServiceNowSettings>,
    pub smartsheet: SmartsheetSettings,
    pub customers: Vec<Customer>,
    pub window: WindowMode,
    pub http_timeout: Duration,
    pub row_cap: usize,
}

impl Config {
    /// Load from the process environment.
    ///
    /// `customers_file` takes precedence over `QBR_CUSTOMERS_FILE`.
    pub fn from_env(customers_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), customers_file)
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F, customers_file: Option<&Path>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let window = parse_window(get("QBR_WINDOW"), get("QBR_WINDOW_DAYS"))?;
        let http_timeout = parse_timeout(get("QBR_HTTP_TIMEOUT_SECS"))?;
        let row_cap = parse_row_cap(get("QBR_ROW_CAP"))?;

        let raw = load_raw_customers(&get, customers_file)?;
        let customers = resolve_customers(raw, &get)?;

        let needs = |source: Source| customers.iter().any(|c| c.wants(source));

        let opsgenie = if needs(Source::Opsgenie) {
            Some(OpsgenieSettings {
                api_key: Secret::new(
                    get("OPSGENIE_API_KEY").ok_or(ConfigError::Missing("OPSGENIE_API_KEY"))?,
                ),
                base_url: get("OPSGENIE_API_URL").unwrap_or_else(|| OPSGENIE_API_BASE.to_string()),
            })
        } else {
            None
        };

        let servicenow = if needs(Source::ServiceNow) {
            let instance_url = match get("SERVICENOW_INSTANCE_URL") {
                Some(url) => url,
                None => ServiceNowCollector::instance_url_for(
                    &get("SERVICENOW_INSTANCE_NAME")
                        .ok_or(ConfigError::Missing("SERVICENOW_INSTANCE_NAME"))?,
                ),
            };
            Some(ServiceNowSettings {
                instance_url,
                username: get("SERVICENOW_USERNAME")
                    .ok_or(ConfigError::Missing("SERVICENOW_USERNAME"))?,
                password: Secret::new(
                    get("SERVICENOW_PASSWORD").ok_or(ConfigError::Missing("SERVICENOW_PASSWORD"))?,
                ),
            })
        } else {
            None
        };

        let smartsheet = SmartsheetSettings {
            api_key: Secret::new(
                get("SMARTSHEET_API_KEY").ok_or(ConfigError::Missing("SMARTSHEET_API_KEY"))?,
            ),
            base_url: get("SMARTSHEET_API_URL").unwrap_or_else(|| SMARTSHEET_API_BASE.to_string()),
        };

        Ok(Self {
            opsgenie,
            servicenow,
            smartsheet,
            customers,
            window,
            http_timeout,
            row_cap,
        })
    }
}

// ============================================================================
// Scalar settings
// ============================================================================

fn parse_window(mode: Option<String>, days: Option<String>) -> Result<WindowMode, ConfigError> {
    let days = match days {
        Some(raw) => match raw.trim().parse::<u32>() {
            Ok(days) if (1..=MAX_WINDOW_DAYS).contains(&days) => days,
            _ => {
                return Err(ConfigError::Invalid {
                    key: "QBR_WINDOW_DAYS",
                    reason: format!("expected 1..={MAX_WINDOW_DAYS} days, got {raw:?}"),
                })
            }
        },
        None => DEFAULT_WINDOW_DAYS,
    };

    match mode.as_deref().map(|m| m.trim().to_ascii_lowercase()).as_deref() {
        None | Some("trailing") => Ok(WindowMode::Trailing { days }),
        Some("quarter") => Ok(WindowMode::CalendarQuarter),
        Some(other) => Err(ConfigError::Invalid {
            key: "QBR_WINDOW",
            reason: format!("expected \"trailing\" or \"quarter\", got {other:?}"),
        }),
    }
}

fn parse_timeout(raw: Option<String>) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::Invalid {
            key: "QBR_HTTP_TIMEOUT_SECS",
            reason: format!("expected a positive number of seconds, got {raw:?}"),
        }),
    }
}

fn parse_row_cap(raw: Option<String>) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(ROW_CAP);
    };
    match raw.trim().parse::<usize>() {
        Ok(cap) if (1..=ROW_CAP).contains(&cap) => Ok(cap),
        _ => Err(ConfigError::Invalid {
            key: "QBR_ROW_CAP",
            reason: format!("expected 1..={ROW_CAP}, got {raw:?}"),
        }),
    }
}

// ============================================================================
// Customer registry
// ============================================================================

/// Customer list as written in a TOML or JSON file.
#[derive(Debug, Deserialize)]
struct CustomerFile {
    customers: Vec<RawCustomer>,
}

/// One customer entry. Accepts both the structured layout and the flat
/// legacy keys.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCustomer {
    name: Option<String>,
    servicenow_aliases: Vec<String>,
    opsgenie_tag: Option<String>,
    prtg_instances: Vec<RawPrtgInstance>,
    prtg_probe_substrings: Vec<String>,
    sheets: Option<SheetTargets>,

    // Legacy keys
    servicenow_company_name: Option<OneOrMany>,
    prtg_instance_urls: Vec<String>,
    prtg_usernames: Vec<String>,
    prtg_passhashs: Vec<String>,
    smartsheet_opsgenie_alerts_sheet_id: Option<LenientId>,
    smartsheet_servicenow_tickets_sheet_id: Option<LenientId>,
    smartsheet_prtg_alerts_sheet_id: Option<LenientId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPrtgInstance {
    url: String,
    api_key: Option<String>,
    api_key_env: Option<String>,
    username: Option<String>,
    passhash: Option<String>,
    passhash_env: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Sheet IDs show up as numbers or numeric strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LenientId {
    Number(SheetId),
    Text(String),
}

impl LenientId {
    /// An empty string means no sheet.
    fn parse(self, key: &str) -> Result<Option<SheetId>, String> {
        match self {
            Self::Number(id) => Ok(Some(id)),
            Self::Text(text) if text.trim().is_empty() => Ok(None),
            Self::Text(text) => text
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| format!("{key} is not a sheet ID: {text:?}")),
        }
    }
}

fn legacy_sheet_id(id: Option<LenientId>, key: &str) -> Result<Option<SheetId>, String> {
    id.map_or(Ok(None), |id| id.parse(key))
}

fn load_raw_customers(
    get: &dyn Fn(&str) -> Option<String>,
    customers_file: Option<&Path>,
) -> Result<Vec<RawCustomer>, ConfigError> {
    let file = customers_file
        .map(Path::to_path_buf)
        .or_else(|| get("QBR_CUSTOMERS_FILE").map(Into::into));

    if let Some(path) = file {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;
        return match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => parse_toml_customers(&origin, &text),
            Some("json") => parse_json_customers(&origin, &text),
            _ => Err(ConfigError::Invalid {
                key: "QBR_CUSTOMERS_FILE",
                reason: format!("{origin} must end in .toml or .json"),
            }),
        };
    }

    match get("CUSTOMER_CONFIGS") {
        Some(json) => parse_json_customers("CUSTOMER_CONFIGS", &json),
        None => Err(ConfigError::NoCustomers),
    }
}

fn parse_toml_customers(origin: &str, text: &str) -> Result<Vec<RawCustomer>, ConfigError> {
    toml::from_str::<CustomerFile>(text)
        .map(|file| file.customers)
        .map_err(|e| ConfigError::Parse {
            origin: origin.to_string(),
            message: e.to_string(),
        })
}

/// JSON is either a bare array of customers or `{"customers": [...]}`.
fn parse_json_customers(origin: &str, text: &str) -> Result<Vec<RawCustomer>, ConfigError> {
    let parse_error = |e: serde_json::Error| ConfigError::Parse {
        origin: origin.to_string(),
        message: e.to_string(),
    };

    let value: serde_json::Value = serde_json::from_str(text).map_err(parse_error)?;
    if value.is_array() {
        serde_json::from_value(value).map_err(parse_error)
    } else {
        serde_json::from_value::<CustomerFile>(value)
            .map(|file| file.customers)
            .map_err(parse_error)
    }
}

fn resolve_customers(
    raw: Vec<RawCustomer>,
    get: &dyn Fn(&str) -> Option<String>,
) -> Result<Vec<Customer>, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::NoCustomers);
    }

    let mut seen = HashSet::new();
    let mut customers = Vec::with_capacity(raw.len());
    for (index, entry) in raw.into_iter().enumerate() {
        let customer = entry.resolve(index, get)?;
        if !seen.insert(customer.name.clone()) {
            return Err(ConfigError::DuplicateCustomer(customer.name));
        }
        customers.push(customer);
    }
    Ok(customers)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RawCustomer {
    fn resolve(
        self,
        index: usize,
        get: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Customer, ConfigError> {
        let opsgenie_tag = non_empty(self.opsgenie_tag);
        let name = non_empty(self.name)
            .or_else(|| opsgenie_tag.clone())
            .ok_or_else(|| ConfigError::Customer {
                customer: format!("#{}", index + 1),
                message: "needs a name or an opsgenie_tag".to_string(),
            })?;
        let invalid = |message: String| ConfigError::Customer {
            customer: name.clone(),
            message,
        };

        let mut servicenow_aliases: Vec<String> = Vec::new();
        let legacy_aliases = self
            .servicenow_company_name
            .map(OneOrMany::into_vec)
            .unwrap_or_default();
        for alias in self.servicenow_aliases.into_iter().chain(legacy_aliases) {
            let alias = alias.trim().to_string();
            if !alias.is_empty() && !servicenow_aliases.contains(&alias) {
                servicenow_aliases.push(alias);
            }
        }

        let mut prtg_instances = Vec::new();
        for instance in self.prtg_instances {
            prtg_instances.push(instance.resolve(get).map_err(&invalid)?);
        }

        let urls = self.prtg_instance_urls.len();
        if self.prtg_usernames.len() != urls || self.prtg_passhashs.len() != urls {
            return Err(invalid(format!(
                "prtg_instance_urls ({urls}), prtg_usernames ({}) and prtg_passhashs ({}) must have the same length",
                self.prtg_usernames.len(),
                self.prtg_passhashs.len()
            )));
        }
        for ((url, username), passhash) in self
            .prtg_instance_urls
            .into_iter()
            .zip(self.prtg_usernames)
            .zip(self.prtg_passhashs)
        {
            prtg_instances.push(PrtgInstance {
                url: parse_url(&url).map_err(&invalid)?,
                credentials: PrtgCredentials::Passhash { username, passhash },
            });
        }

        let mut sheets = self.sheets.unwrap_or_default();
        if let Some(id) = legacy_sheet_id(
            self.smartsheet_opsgenie_alerts_sheet_id,
            "smartsheet_opsgenie_alerts_sheet_id",
        )
        .map_err(&invalid)?
        {
            sheets.opsgenie.get_or_insert(id);
        }
        if let Some(id) = legacy_sheet_id(
            self.smartsheet_servicenow_tickets_sheet_id,
            "smartsheet_servicenow_tickets_sheet_id",
        )
        .map_err(&invalid)?
        {
            sheets.servicenow.get_or_insert(id);
        }
        if let Some(id) = legacy_sheet_id(
            self.smartsheet_prtg_alerts_sheet_id,
            "smartsheet_prtg_alerts_sheet_id",
        )
        .map_err(&invalid)?
        {
            sheets.prtg.get_or_insert(id);
        }
        if sheets.is_empty() {
            return Err(invalid("has no sheet targets".to_string()));
        }

        Ok(Customer {
            servicenow_aliases,
            opsgenie_tag,
            prtg_instances,
            prtg_probe_substrings: self
                .prtg_probe_substrings
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .collect(),
            sheets,
            name,
        })
    }
}

impl RawPrtgInstance {
    fn resolve(self, get: &dyn Fn(&str) -> Option<String>) -> Result<PrtgInstance, String> {
        let url = parse_url(&self.url)?;

        let from_env = |var: &str| {
            get(var).ok_or_else(|| format!("environment variable {var} for {url} is not set"))
        };

        let credentials = if let Some(token) = non_empty(self.api_key) {
            PrtgCredentials::ApiToken(token)
        } else if let Some(var) = non_empty(self.api_key_env) {
            PrtgCredentials::ApiToken(from_env(&var)?)
        } else if let Some(username) = non_empty(self.username) {
            let passhash = match (non_empty(self.passhash), non_empty(self.passhash_env)) {
                (Some(passhash), _) => passhash,
                (None, Some(var)) => from_env(&var)?,
                (None, None) => return Err(format!("{url} has a username but no passhash")),
            };
            PrtgCredentials::Passhash { username, passhash }
        } else {
            return Err(format!("{url} has no credentials"));
        };

        Ok(PrtgInstance { url, credentials })
    }
}

fn parse_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("invalid PRTG URL {raw:?}: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(format!("PRTG URL {raw:?} has unsupported scheme {scheme}")),
    }
}
