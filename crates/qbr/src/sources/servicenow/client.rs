//! ServiceNow Table API client.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::models::{ServiceNowTicket, TableResponse, TICKET_FIELDS};
use crate::http::{self, error_message};
use crate::models::{Customer, ReportWindow, Source};
use crate::records::{Record, TicketRecord, TicketTable};
use crate::sources::{Collector, SourceError};

/// Rows requested per Table API page.
pub const PAGE_LIMIT: usize = 1_000;

/// Collects tickets for every ServiceNow alias of a customer.
#[derive(Debug, Clone)]
pub struct ServiceNowCollector {
    client: reqwest::Client,
    instance_url: String,
    username: String,
    password: String,
}

impl ServiceNowCollector {
    /// Create a new ServiceNow collector.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are empty or the HTTP client fails to build.
    pub fn new(
        instance_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() || password.is_empty() {
            return Err(SourceError::Config(
                "ServiceNow username and password are required".to_string(),
            ));
        }

        Ok(Self {
            client: http::client(timeout)?,
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
            username,
            password,
        })
    }

    /// Base URL of a hosted instance.
    #[must_use]
    pub fn instance_url_for(instance_name: &str) -> String {
        format!("https://{instance_name}.service-now.com")
    }

    /// Encoded query for one company alias created inside the window.
    ///
    /// `gs.dateGenerate` reads its arguments in the instance's time zone while
    /// the window start is UTC, so the lower edge shifts by the instance's UTC
    /// offset.
    pub(crate) fn build_query(alias: &str, window: &ReportWindow) -> String {
        format!(
            "company.name={}^sys_created_on>=javascript:gs.dateGenerate('{}','{}')^ORDERBYsys_created_on",
            alias.replace('^', "^^"),
            window.start.format("%Y-%m-%d"),
            window.start.format("%H:%M:%S"),
        )
    }

    /// Fetch every ticket in `table` for one alias.
    async fn query_table(
        &self,
        table: TicketTable,
        query: &str,
    ) -> Result<Vec<ServiceNowTicket>, SourceError> {
        let url = format!("{}/api/now/table/{}", self.instance_url, table.api_name());
        let fields = TICKET_FIELDS.join(",");
        let mut tickets = Vec::new();
        let mut offset = 0;

        loop {
            debug!(url = %url, offset, "Making ServiceNow API request");

            let response = self
                .client
                .get(&url)
                .basic_auth(&self.username, Some(&self.password))
                .header("Accept", "application/json")
                .query(&[
                    ("sysparm_query", query.to_string()),
                    ("sysparm_fields", fields.clone()),
                    ("sysparm_display_value", "true".to_string()),
                    ("sysparm_exclude_reference_link", "true".to_string()),
                    ("sysparm_limit", PAGE_LIMIT.to_string()),
                    ("sysparm_offset", offset.to_string()),
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
            let page: TableResponse<ServiceNowTicket> = serde_json::from_str(&body)?;
            let fetched = page.result.len();
            tickets.extend(page.result);

            if fetched < PAGE_LIMIT {
                break;
            }
            offset += fetched;
        }

        Ok(tickets)
    }

    fn convert_ticket(customer: &str, table: TicketTable, ticket: ServiceNowTicket) -> TicketRecord {
        TicketRecord {
            customer: customer.to_string(),
            table,
            number: ticket.number,
            location: ticket.location,
            configuration_item: ticket.configuration_item,
            short_description: ticket.short_description,
            state: ticket.state,
            category: ticket.category,
            priority: ticket.priority,
            risk: ticket.risk,
            assigned_to: ticket.assigned_to,
            opened_at: ticket.opened_at,
            updated_by: ticket.updated_by,
            closed_at: ticket.closed_at,
        }
    }
}

/// Union tickets across aliases, first occurrence of a number wins.
///
/// The result is ordered newest `opened_at` first; tickets whose timestamp
/// cannot be parsed go last.
pub(crate) fn merge_tickets(batches: Vec<Vec<TicketRecord>>) -> (Vec<TicketRecord>, usize) {
    let mut seen = HashSet::new();
    let mut duplicates = 0;
    let mut merged = Vec::new();

    for ticket in batches.into_iter().flatten() {
        if ticket.number.is_empty() || seen.insert(ticket.number.clone()) {
            merged.push(ticket);
        } else {
            duplicates += 1;
        }
    }

    merged.sort_by(|a, b| b.opened_at_time().cmp(&a.opened_at_time()));
    (merged, duplicates)
}

#[async_trait]
impl Collector for ServiceNowCollector {
    fn source(&self) -> Source {
        Source::ServiceNow
    }

    #[instrument(skip_all, fields(source = "servicenow", customer = %customer.name))]
    async fn collect(
        &self,
        customer: &Customer,
        window: &ReportWindow,
    ) -> Result<Vec<Record>, SourceError> {
        if customer.servicenow_aliases.is_empty() {
            debug!("No ServiceNow aliases configured, skipping");
            return Ok(Vec::new());
        }

        let mut batches = Vec::new();
        for alias in &customer.servicenow_aliases {
            let query = Self::build_query(alias, window);
            for table in TicketTable::ALL {
                let tickets = self.query_table(table, &query).await?;
                debug!(alias = %alias, table = table.api_name(), count = tickets.len(), "Tickets fetched");
                batches.push(
                    tickets
                        .into_iter()
                        .map(|t| Self::convert_ticket(&customer.name, table, t))
                        .collect(),
                );
            }
        }

        let (tickets, duplicates) = merge_tickets(batches);
        debug!(
            tickets = tickets.len(),
            duplicates, "ServiceNow tickets gathered"
        );
        Ok(tickets.into_iter().map(Record::Ticket).collect())
    }
}
