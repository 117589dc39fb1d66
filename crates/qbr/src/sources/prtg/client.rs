//! PRTG HTTP API client.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::models::{is_alerting, PrtgSensor, SensorTable, ALERTING_STATUSES, SENSOR_COLUMNS};
use crate::http::{self, error_message};
use crate::models::{Customer, PrtgInstance, ReportWindow, Source};
use crate::records::{Record, SensorRecord};
use crate::sources::{Collector, SourceError};

/// Most sensors requested from one instance.
pub const MAX_SENSORS: u32 = 50_000;

/// Collects currently alerting sensors from every PRTG instance of a customer.
#[derive(Debug, Clone)]
pub struct PrtgCollector {
    client: reqwest::Client,
}

impl PrtgCollector {
    /// Create a new PRTG collector. Credentials come from each instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: http::client(timeout)?,
        })
    }

    /// Query parameters for the sensors table, without credentials.
    pub(crate) fn build_params(probe_substrings: &[String]) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("content", "sensors".to_string()),
            ("columns", SENSOR_COLUMNS.to_string()),
            ("count", MAX_SENSORS.to_string()),
        ];
        for status in ALERTING_STATUSES {
            params.push(("filter_status", status.to_string()));
        }
        for substring in probe_substrings {
            params.push(("filter_probe", format!("@sub({substring})")));
        }
        params
    }

    /// Fetch alerting sensors from one instance.
    async fn fetch_sensors(
        &self,
        instance: &PrtgInstance,
        probe_substrings: &[String],
    ) -> Result<Vec<PrtgSensor>, SourceError> {
        let url = format!("{}/api/table.json", instance.url.as_str().trim_end_matches('/'));
        debug!(url = %url, "Making PRTG API request");

        // Credentials travel in the query string; keep them out of errors.
        let response = self
            .client
            .get(&url)
            .query(&Self::build_params(probe_substrings))
            .query(&instance.credentials.query_pairs())
            .send()
            .await
            .map_err(|e| SourceError::Http(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(
                status,
                error_message(response).await,
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Http(e.without_url()))?;
        let table: SensorTable = serde_json::from_str(&body)?;
        debug!(
            version = %table.prtg_version,
            treesize = table.treesize,
            returned = table.sensors.len(),
            "PRTG sensors fetched"
        );

        Ok(table
            .sensors
            .into_iter()
            .filter(|sensor| is_alerting(sensor.status_raw))
            .collect())
    }

    fn convert_sensor(customer: &str, instance: &PrtgInstance, sensor: PrtgSensor) -> SensorRecord {
        SensorRecord {
            customer: customer.to_string(),
            instance: instance.url.to_string(),
            object_id: sensor.objid,
            name: sensor.name,
            status: sensor.status,
            status_raw: sensor.status_raw,
            down_since: sensor.downtimesince,
            probe: sensor.probe,
            group: sensor.group,
            device: sensor.device,
            message: sensor.message_raw,
        }
    }
}

#[async_trait]
impl Collector for PrtgCollector {
    fn source(&self) -> Source {
        Source::Prtg
    }

    #[instrument(skip_all, fields(source = "prtg", customer = %customer.name))]
    async fn collect(
        &self,
        customer: &Customer,
        _window: &ReportWindow,
    ) -> Result<Vec<Record>, SourceError> {
        if customer.prtg_instances.is_empty() {
            debug!("No PRTG instances configured, skipping");
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        let mut failed = 0;
        let mut last_error = None;

        for instance in &customer.prtg_instances {
            match self
                .fetch_sensors(instance, &customer.prtg_probe_substrings)
                .await
            {
                Ok(sensors) => {
                    debug!(instance = %instance.url, alerting = sensors.len(), "PRTG instance done");
                    records.extend(sensors.into_iter().map(|sensor| {
                        Record::Sensor(Self::convert_sensor(&customer.name, instance, sensor))
                    }));
                }
                Err(e) => {
                    warn!(
                        instance = %instance.url,
                        error = %e,
                        "PRTG instance failed, continuing with remaining instances"
                    );
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(last) if failed == customer.prtg_instances.len() => {
                Err(SourceError::AllInstancesFailed {
                    failed,
                    last: Box::new(last),
                })
            }
            _ => Ok(records),
        }
    }
}
