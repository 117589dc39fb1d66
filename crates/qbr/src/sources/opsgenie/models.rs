//! Opsgenie Alert API response models.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Page returned by `GET /v2/alerts`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsgenieAlertPage {
    /// Alerts on this page.
    #[serde(default)]
    pub data: Vec<OpsgenieAlert>,
    /// Links to neighbouring pages.
    #[serde(default)]
    pub paging: OpsgeniePaging,
    /// Request identifier, useful when talking to Atlassian support.
    pub request_id: Option<String>,
}

/// Paging links; `next` is absent on the last page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpsgeniePaging {
    pub next: Option<String>,
}

/// Alert summary as returned by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsgenieAlert {
    pub id: String,
    #[serde(default)]
    pub tiny_id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub priority: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_deserializes_minimal_alert() {
        let body = r#"{
            "data": [{"id": "70413a06", "createdAt": "2024-03-01T10:00:00.123Z"}],
            "paging": {"first": "https://api.opsgenie.com/v2/alerts?offset=0"},
            "took": 0.6,
            "requestId": "9ae63dd7"
        }"#;
        let page: OpsgenieAlertPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.data.len(), 1);
        assert!(page.paging.next.is_none());
        assert_eq!(page.data[0].count, 0);
        assert!(page.data[0].tags.is_empty());
        assert_eq!(page.request_id.as_deref(), Some("9ae63dd7"));
    }
}
