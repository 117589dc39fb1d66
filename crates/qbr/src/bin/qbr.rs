//! QBR sync - publish quarterly customer data to Smartsheet.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use qbr::logging::init_tracing;
use qbr::{
    Config, OpsgenieCollector, PrtgCollector, Runner, ServiceNowCollector, SmartsheetClient,
};

/// QBR sync - collect alerts, tickets, and sensors per customer and publish them to Smartsheet.
#[derive(Parser)]
#[command(name = "qbr")]
#[command(about = "Quarterly business report sync to Smartsheet")]
#[command(version)]
pub struct Cli {
    /// Customer registry (.toml or .json); falls back to CUSTOMER_CONFIGS
    #[arg(long, env = "QBR_CUSTOMERS_FILE")]
    customers_file: Option<PathBuf>,

    /// Collect and cap, but do not touch Smartsheet
    #[arg(long, env = "QBR_DRY_RUN")]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format ("json" for JSON lines)
    #[arg(long, env = "QBR_LOG_FORMAT", default_value = "text")]
    log_format: String,
}

fn build_runner(config: &Config, dry_run: bool) -> Result<Runner> {
    let window = config.window.resolve(chrono::Utc::now());
    let mut runner = Runner::new(window, config.row_cap);

    if let Some(opsgenie) = &config.opsgenie {
        let collector = OpsgenieCollector::new(
            opsgenie.api_key.expose(),
            &opsgenie.base_url,
            config.http_timeout,
        )
        .context("Failed to create Opsgenie collector")?;
        runner = runner.with_collector(Arc::new(collector));
    }

    if let Some(servicenow) = &config.servicenow {
        let collector = ServiceNowCollector::new(
            &servicenow.instance_url,
            &servicenow.username,
            servicenow.password.expose(),
            config.http_timeout,
        )
        .context("Failed to create ServiceNow collector")?;
        runner = runner.with_collector(Arc::new(collector));
    }

    let prtg = PrtgCollector::new(config.http_timeout).context("Failed to create PRTG collector")?;
    runner = runner.with_collector(Arc::new(prtg));

    if dry_run {
        warn!("Dry run: Smartsheet will not be modified");
    } else {
        let publisher = SmartsheetClient::new(
            config.smartsheet.api_key.expose(),
            &config.smartsheet.base_url,
            config.http_timeout,
        )
        .context("Failed to create Smartsheet client")?;
        runner = runner.with_publisher(Arc::new(publisher));
    }

    Ok(runner)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_format.eq_ignore_ascii_case("json"));

    let config = Config::from_env(cli.customers_file.as_deref())
        .context("Failed to load configuration")?;
    info!(customers = config.customers.len(), "Configuration loaded");

    let runner = build_runner(&config, cli.dry_run)?;
    let report = runner.run(&config.customers).await;

    for customer in &report.customers {
        for error in customer.errors() {
            warn!(customer = %customer.customer, error = %error, "Customer error");
        }
    }
    info!(
        customers = report.customers.len(),
        failed = report.failed_customers().len(),
        published = report.published(),
        elapsed_secs = (report.finished_at - report.started_at).num_seconds(),
        "Done"
    );

    Ok(())
}
