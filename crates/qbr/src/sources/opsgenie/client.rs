//! Opsgenie Alert API client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::models::{OpsgenieAlert, OpsgenieAlertPage};
use crate::http::{self, error_message};
use crate::models::{Customer, ReportWindow, Source};
use crate::records::{AlertRecord, Record};
use crate::sources::{Collector, SourceError};

/// Default Opsgenie API base (the EU region uses `api.eu.opsgenie.com`).
pub const OPSGENIE_API_BASE: &str = "https://api.opsgenie.com";

/// Largest page the list endpoint accepts.
pub const PAGE_LIMIT: u32 = 100;

/// Opsgenie rejects requests with `offset + limit` above this.
pub const MAX_OFFSET: u32 = 20_000;

/// Collects a customer's alerts by tag.
#[derive(Debug, Clone)]
pub struct OpsgenieCollector {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpsgenieCollector {
    /// Create a new Opsgenie collector.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client fails to build.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(SourceError::Config(
                "Opsgenie API key is required".to_string(),
            ));
        }

        Ok(Self {
            client: http::client(timeout)?,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build the alert search query for a tag and window.
    ///
    /// Opsgenie only compares `createdAt` at day granularity here; the exact
    /// window is applied to the results.
    pub(crate) fn build_query(tag: &str, window: &ReportWindow) -> String {
        format!(
            "createdAt >= {} AND tag: \"{}\"",
            window.start.format("%d-%m-%Y"),
            tag.replace('"', "\\\"")
        )
    }

    /// Fetch one page of alerts.
    async fn list_alerts(
        &self,
        query: &str,
        offset: u32,
    ) -> Result<OpsgenieAlertPage, SourceError> {
        let url = format!("{}/v2/alerts", self.base_url);
        debug!(url = %url, offset, "Making Opsgenie API request");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("GenieKey {}", self.api_key))
            .query(&[
                ("query", query.to_string()),
                ("offset", offset.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
                ("sort", "createdAt".to_string()),
                ("order", "desc".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(
                status,
                error_message(response).await,
            ));
        }

        let body = response.text().await?;
        let page: OpsgenieAlertPage = serde_json::from_str(&body)?;
        debug!(
            request_id = page.request_id.as_deref().unwrap_or_default(),
            returned = page.data.len(),
            "Opsgenie page fetched"
        );
        Ok(page)
    }

    /// Page through every alert matching `query`, newest first.
    async fn search(&self, query: &str) -> Result<Vec<OpsgenieAlert>, SourceError> {
        let mut alerts = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_alerts(query, offset).await?;
            let fetched = page.data.len();
            alerts.extend(page.data);

            if page.paging.next.is_none() || fetched == 0 {
                break;
            }

            offset += PAGE_LIMIT;
            if offset + PAGE_LIMIT > MAX_OFFSET {
                warn!(
                    fetched = alerts.len(),
                    "Opsgenie pagination limit reached, remaining alerts skipped"
                );
                break;
            }
        }

        Ok(alerts)
    }

    fn convert_alert(customer: &str, alert: OpsgenieAlert) -> AlertRecord {
        AlertRecord {
            customer: customer.to_string(),
            id: alert.id,
            tiny_id: alert.tiny_id,
            alias: alert.alias,
            message: alert.message,
            status: alert.status,
            acknowledged: alert.acknowledged,
            source: alert.source,
            count: alert.count,
            priority: alert.priority,
            tags: alert.tags,
            created_at: alert.created_at,
        }
    }
}

#[async_trait]
impl Collector for OpsgenieCollector {
    fn source(&self) -> Source {
        Source::Opsgenie
    }

    #[instrument(skip_all, fields(source = "opsgenie", customer = %customer.name))]
    async fn collect(
        &self,
        customer: &Customer,
        window: &ReportWindow,
    ) -> Result<Vec<Record>, SourceError> {
        let Some(tag) = customer.opsgenie_tag.as_deref() else {
            debug!("No Opsgenie tag configured, skipping");
            return Ok(Vec::new());
        };

        let query = Self::build_query(tag, window);
        let alerts = self.search(&query).await?;
        let total = alerts.len();

        let records: Vec<Record> = alerts
            .into_iter()
            .filter(|alert| window.contains(alert.created_at))
            .map(|alert| Record::Alert(Self::convert_alert(&customer.name, alert)))
            .collect();

        debug!(
            fetched = total,
            in_window = records.len(),
            "Opsgenie alerts gathered"
        );
        Ok(records)
    }
}
