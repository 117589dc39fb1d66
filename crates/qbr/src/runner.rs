//! Per-customer orchestration: collect, cap, publish.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::models::{Customer, ReportWindow, SheetId, Source};
use crate::records::{Record, RowSet};
use crate::smartsheet::Publisher;
use crate::sources::Collector;

/// What happened to one source of one customer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub sheet_id: SheetId,
    /// Records returned by the collector.
    pub collected: usize,
    /// Records cut by the row cap.
    pub dropped: usize,
    /// Rows written to the sheet; `None` when nothing was published.
    pub published: Option<usize>,
    pub collect_error: Option<String>,
    pub publish_error: Option<String>,
}

impl SourceReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.collect_error.is_none() && self.publish_error.is_none()
    }
}

/// Outcome for one customer. Sources without a sheet are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerReport {
    pub customer: String,
    pub sources: BTreeMap<Source, SourceReport>,
}

impl CustomerReport {
    #[must_use]
    pub fn source(&self, source: Source) -> Option<&SourceReport> {
        self.sources.get(&source)
    }

    /// Rows published across all sheets.
    #[must_use]
    pub fn published(&self) -> usize {
        self.sources.values().filter_map(|s| s.published).sum()
    }

    #[must_use]
    pub fn dropped(&self) -> usize {
        self.sources.values().map(|s| s.dropped).sum()
    }

    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.sources
            .iter()
            .flat_map(|(source, report)| {
                report
                    .collect_error
                    .iter()
                    .map(move |e| format!("{source} collect: {e}"))
                    .chain(
                        report
                            .publish_error
                            .iter()
                            .map(move |e| format!("{source} publish: {e}")),
                    )
            })
            .collect()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.sources.values().all(SourceReport::is_ok)
    }
}

/// Outcome of one run over the whole registry.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub window: ReportWindow,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub customers: Vec<CustomerReport>,
}

impl RunReport {
    #[must_use]
    pub fn customer(&self, name: &str) -> Option<&CustomerReport> {
        self.customers.iter().find(|c| c.customer == name)
    }

    /// Customers with at least one collect or publish error.
    #[must_use]
    pub fn failed_customers(&self) -> Vec<&str> {
        self.customers
            .iter()
            .filter(|c| !c.is_ok())
            .map(|c| c.customer.as_str())
            .collect()
    }

    #[must_use]
    pub fn published(&self) -> usize {
        self.customers.iter().map(CustomerReport::published).sum()
    }
}

/// Runs the report for every customer, one at a time.
pub struct Runner {
    collectors: Vec<Arc<dyn Collector>>,
    /// `None` for a dry run.
    publisher: Option<Arc<dyn Publisher>>,
    window: ReportWindow,
    row_cap: usize,
}

impl Runner {
    #[must_use]
    pub fn new(window: ReportWindow, row_cap: usize) -> Self {
        Self {
            collectors: Vec::new(),
            publisher: None,
            window,
            row_cap,
        }
    }

    #[must_use]
    pub fn with_collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.collectors.push(collector);
        self
    }

    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    fn collector_for(&self, source: Source) -> Option<&Arc<dyn Collector>> {
        self.collectors.iter().find(|c| c.source() == source)
    }

    /// Process every customer. Failures are recorded, never propagated.
    pub async fn run(&self, customers: &[Customer]) -> RunReport {
        let started_at = Utc::now();
        info!(
            customers = customers.len(),
            start = %self.window.start,
            end = %self.window.end,
            dry_run = self.publisher.is_none(),
            "Starting QBR run"
        );

        let mut reports = Vec::with_capacity(customers.len());
        for customer in customers {
            reports.push(self.run_customer(customer).await);
        }

        let report = RunReport {
            window: self.window,
            started_at,
            finished_at: Utc::now(),
            customers: reports,
        };

        let failed = report.failed_customers();
        if failed.is_empty() {
            info!(published = report.published(), "QBR run complete");
        } else {
            warn!(
                published = report.published(),
                failed = ?failed,
                "QBR run complete with failures"
            );
        }
        report
    }

    /// Collect, cap, and publish one customer.
    #[instrument(skip_all, fields(customer = %customer.name))]
    pub async fn run_customer(&self, customer: &Customer) -> CustomerReport {
        info!("Beginning QBR automation");

        let mut report = CustomerReport {
            customer: customer.name.clone(),
            sources: BTreeMap::new(),
        };
        let mut records: Vec<Record> = Vec::new();

        for source in Source::ALL {
            let Some(sheet_id) = customer.sheets.for_source(source) else {
                debug!(%source, "No sheet configured, skipping source");
                continue;
            };
            let entry = report.sources.entry(source).or_insert_with(|| SourceReport {
                sheet_id,
                ..SourceReport::default()
            });

            let Some(collector) = self.collector_for(source) else {
                debug!(%source, "No collector for source, publishing empty sheet");
                continue;
            };

            match collector.collect(customer, &self.window).await {
                Ok(collected) => {
                    info!(%source, records = collected.len(), "Source collected");
                    entry.collected = collected.len();
                    records.extend(collected);
                }
                Err(e) => {
                    warn!(%source, error = %e, "Source failed, leaving its sheet untouched");
                    entry.collect_error = Some(e.to_string());
                }
            }
        }

        let rows = RowSet::build(records, self.row_cap);
        if rows.dropped() > 0 {
            warn!(
                kept = rows.len(),
                dropped = rows.dropped(),
                cap = self.row_cap,
                "Row cap reached, later sources truncated"
            );
        }

        for (&source, entry) in &mut report.sources {
            entry.dropped = rows.dropped_for(source);
            if entry.collect_error.is_some() {
                continue;
            }

            let sheet_rows = rows.rows_for(source);
            let Some(publisher) = &self.publisher else {
                info!(%source, rows = sheet_rows.len(), "Dry run, not publishing");
                continue;
            };

            match publisher.replace_rows(entry.sheet_id, &sheet_rows).await {
                Ok(outcome) => {
                    info!(
                        %source,
                        sheet = %outcome.sheet_name,
                        rows = outcome.added,
                        "Sheet updated"
                    );
                    entry.published = Some(outcome.added);
                }
                Err(e) => {
                    error!(%source, sheet_id = entry.sheet_id, error = %e, "Failed to publish sheet");
                    entry.publish_error = Some(e.to_string());
                }
            }
        }

        info!(published = report.published(), "Completed QBR automation");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SheetTargets;
    use crate::records::tests::{alert, sensor, ticket};
    use crate::records::SheetRow;
    use crate::smartsheet::{PublishError, PublishOutcome};
    use crate::sources::SourceError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeCollector {
        source: Source,
        result: fn() -> Result<Vec<Record>, SourceError>,
    }

    #[async_trait]
    impl Collector for FakeCollector {
        fn source(&self) -> Source {
            self.source
        }

        async fn collect(
            &self,
            _customer: &Customer,
            _window: &ReportWindow,
        ) -> Result<Vec<Record>, SourceError> {
            (self.result)()
        }
    }

    #[derive(Default)]
    struct FakePublisher {
        calls: Mutex<Vec<(SheetId, Vec<SheetRow>)>>,
        fail_sheet: Option<SheetId>,
    }

    #[async_trait]
    impl Publisher for FakePublisher {
        async fn replace_rows(
            &self,
            sheet_id: SheetId,
            rows: &[SheetRow],
        ) -> Result<PublishOutcome, PublishError> {
            if self.fail_sheet == Some(sheet_id) {
                return Err(PublishError::Api {
                    status: 404,
                    message: "Not Found".to_string(),
                });
            }
            self.calls.lock().unwrap().push((sheet_id, rows.to_vec()));
            Ok(PublishOutcome {
                sheet_name: format!("sheet {sheet_id}"),
                cleared: 0,
                added: rows.len(),
            })
        }
    }

    fn customer(sheets: SheetTargets) -> Customer {
        Customer {
            name: "Acme".to_string(),
            servicenow_aliases: Vec::new(),
            opsgenie_tag: None,
            prtg_instances: Vec::new(),
            prtg_probe_substrings: Vec::new(),
            sheets,
        }
    }

    fn all_sheets() -> SheetTargets {
        SheetTargets {
            opsgenie: Some(1),
            servicenow: Some(2),
            prtg: Some(3),
        }
    }

    fn window() -> ReportWindow {
        ReportWindow::trailing_days(Utc::now(), 90)
    }

    fn runner(publisher: Arc<FakePublisher>, cap: usize) -> Runner {
        Runner::new(window(), cap)
            .with_collector(Arc::new(FakeCollector {
                source: Source::Opsgenie,
                result: || Ok(vec![alert("a1"), alert("a2")]),
            }))
            .with_collector(Arc::new(FakeCollector {
                source: Source::ServiceNow,
                result: || Ok(vec![ticket("INC1")]),
            }))
            .with_collector(Arc::new(FakeCollector {
                source: Source::Prtg,
                result: || {
                    Err(SourceError::Api {
                        status: 500,
                        message: "boom".to_string(),
                    })
                },
            }))
            .with_publisher(publisher)
    }

    #[tokio::test]
    async fn test_failed_source_leaves_sheet_untouched() {
        let publisher = Arc::new(FakePublisher::default());
        let report = runner(publisher.clone(), 2_500)
            .run_customer(&customer(all_sheets()))
            .await;

        let calls = publisher.calls.lock().unwrap();
        let sheets: Vec<SheetId> = calls.iter().map(|(id, _)| *id).collect();
        assert_eq!(sheets, vec![1, 2]);
        assert_eq!(calls[0].1.len(), 2);
        assert_eq!(calls[1].1.len(), 1);

        assert_eq!(report.published(), 3);
        assert!(report.source(Source::Prtg).unwrap().collect_error.is_some());
        assert_eq!(report.source(Source::Prtg).unwrap().published, None);
        assert!(!report.is_ok());
        assert_eq!(report.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_source_without_sheet_is_not_collected() {
        let publisher = Arc::new(FakePublisher::default());
        let sheets = SheetTargets {
            opsgenie: None,
            servicenow: Some(2),
            prtg: None,
        };
        let report = runner(publisher.clone(), 2_500)
            .run_customer(&customer(sheets))
            .await;

        assert_eq!(report.sources.len(), 1);
        assert!(report.is_ok());
        assert_eq!(publisher.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_cap_applies_across_sources() {
        let publisher = Arc::new(FakePublisher::default());
        let report = runner(publisher.clone(), 2)
            .run_customer(&customer(all_sheets()))
            .await;

        let opsgenie = report.source(Source::Opsgenie).unwrap();
        assert_eq!(opsgenie.published, Some(2));
        let servicenow = report.source(Source::ServiceNow).unwrap();
        assert_eq!(servicenow.collected, 1);
        assert_eq!(servicenow.dropped, 1);
        assert_eq!(servicenow.published, Some(0));
        assert_eq!(report.dropped(), 1);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_stop_other_sheets() {
        let publisher = Arc::new(FakePublisher {
            fail_sheet: Some(1),
            ..FakePublisher::default()
        });
        let report = runner(publisher.clone(), 2_500)
            .run_customer(&customer(all_sheets()))
            .await;

        let opsgenie = report.source(Source::Opsgenie).unwrap();
        assert!(opsgenie.publish_error.is_some());
        assert_eq!(report.source(Source::ServiceNow).unwrap().published, Some(1));
    }

    #[tokio::test]
    async fn test_missing_collector_publishes_empty_sheet() {
        let publisher = Arc::new(FakePublisher::default());
        let runner = Runner::new(window(), 2_500)
            .with_collector(Arc::new(FakeCollector {
                source: Source::Prtg,
                result: || Ok(vec![sensor("Ping")]),
            }))
            .with_publisher(publisher.clone());

        let report = runner.run_customer(&customer(all_sheets())).await;
        assert_eq!(report.source(Source::Opsgenie).unwrap().published, Some(0));
        assert_eq!(report.source(Source::Prtg).unwrap().published, Some(1));
        assert_eq!(publisher.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_dry_run_publishes_nothing() {
        let runner = Runner::new(window(), 2_500).with_collector(Arc::new(FakeCollector {
            source: Source::Opsgenie,
            result: || Ok(vec![alert("a1")]),
        }));

        let report = runner.run(&[customer(all_sheets())]).await;
        let acme = report.customer("Acme").unwrap();
        assert_eq!(acme.source(Source::Opsgenie).unwrap().collected, 1);
        assert_eq!(acme.published(), 0);
        assert!(report.failed_customers().is_empty());
    }
}
