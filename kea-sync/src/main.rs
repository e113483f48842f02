use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use kea_config_core::write_file;
use kea_sync::control::{ControlOptions, HttpConnector};
use kea_sync::credentials::CredentialStore;
use kea_sync::discovery::list_servers;
use kea_sync::inventory::Snapshot;
use kea_sync::report::{render_listing, render_run};
use kea_sync::settings::{LogFormat, LoggingSettings, Settings};
use kea_sync::sync::{RunReport, SyncMode, Synchronizer};
use tracing::info;

mod cli;

use cli::{Cli, Command, ConnectArgs, DiscoverArgs, OutputFormat, PlanArgs, RunArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_or_default(cli.config.as_deref())
        .context("failed to load settings")?;
    init_logging(&settings.logging);

    match cli.command {
        Command::Run(args) => run_sync(args, &settings),
        Command::Plan(args) => run_plan(args, &settings),
        Command::Discover(args) => run_discover(args, &settings),
    }
}

/// Install the tracing subscriber; `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingSettings) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = tracing_subscriber::registry().with(filter);

    match logging.format {
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn run_sync(args: RunArgs, settings: &Settings) -> Result<()> {
    let report = reconcile(&args.connect, settings, SyncMode::Apply)?;
    print_report(&report, args.connect.format)?;
    fail_on_errors(&report)
}

fn run_plan(args: PlanArgs, settings: &Settings) -> Result<()> {
    let report = reconcile(&args.connect, settings, SyncMode::Plan)?;

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        for server in &report.servers {
            for document in &server.documents {
                let path = dir.join(server.document_file_name(document.family));
                write_file(document, &path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(server = %server.server, path = %path.display(), "wrote planned configuration");
            }
        }
    }

    print_report(&report, args.connect.format)?;
    fail_on_errors(&report)
}

fn reconcile(args: &ConnectArgs, settings: &Settings, mode: SyncMode) -> Result<RunReport> {
    let inventory_path = inventory_path(args.inventory.as_deref(), settings)?;
    let inventory = Snapshot::load(&inventory_path)
        .with_context(|| format!("failed to load inventory {}", inventory_path.display()))?;

    let Some(credentials_path) = args.credentials.clone().or_else(|| settings.credentials.clone())
    else {
        bail!("no credentials file given; pass --credentials or set `credentials` in the settings file");
    };
    let credentials = CredentialStore::load(&credentials_path)
        .with_context(|| format!("failed to load credentials {}", credentials_path.display()))?;

    let connector = HttpConnector::new(control_options(args, settings));
    let report = Synchronizer::new(&inventory, &credentials, connector)
        .with_persist(settings.persist.clone())
        .with_mode(mode)
        .run()
        .context("failed to enumerate DHCP servers")?;
    Ok(report)
}

fn control_options(args: &ConnectArgs, settings: &Settings) -> ControlOptions {
    let mut options = settings.control.options();
    if let Some(port) = args.port {
        options.port = port;
    }
    if let Some(timeout) = args.timeout {
        options.timeout = std::time::Duration::from_secs(timeout);
    }
    if args.insecure {
        options.accept_invalid_certs = true;
    }
    options
}

fn inventory_path(flag: Option<&Path>, settings: &Settings) -> Result<PathBuf> {
    match flag.map(Path::to_path_buf).or_else(|| settings.inventory.clone()) {
        Some(path) => Ok(path),
        None => bail!("no inventory given; pass --inventory or set `inventory` in the settings file"),
    }
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render_run(report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

fn fail_on_errors(report: &RunReport) -> Result<()> {
    if !report.is_success() {
        bail!(
            "{} of {} server(s) did not fully synchronize",
            report.failed_servers(),
            report.servers.len()
        );
    }
    Ok(())
}

fn run_discover(args: DiscoverArgs, settings: &Settings) -> Result<()> {
    let path = inventory_path(args.inventory.as_deref(), settings)?;
    let inventory = Snapshot::load(&path)
        .with_context(|| format!("failed to load inventory {}", path.display()))?;

    let listings = list_servers(&inventory, args.subnets).context("failed to enumerate DHCP servers")?;

    match args.format {
        OutputFormat::Text => println!("{}", render_listing(&listings)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listings)?),
    }

    let unresolved = listings.iter().filter(|l| l.error.is_some()).count();
    if unresolved > 0 {
        bail!("{unresolved} server(s) could not be resolved");
    }
    Ok(())
}
