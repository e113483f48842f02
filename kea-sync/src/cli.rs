use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "kea-sync")]
#[command(about = "Reconcile IPAM subnets and DHCP service bindings into Kea servers")]
pub struct Cli {
    /// Settings file (defaults to ./kea-sync.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Push the computed configuration to every discovered server.
    Run(RunArgs),
    /// Fetch live configuration and show what a run would change, without pushing.
    Plan(PlanArgs),
    /// List DHCP servers found in the inventory.
    Discover(DiscoverArgs),
}

/// Inputs shared by commands that talk to servers.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Inventory snapshot (JSON, or TOML by extension).
    #[arg(long)]
    pub inventory: Option<PathBuf>,
    /// Credentials file of [[credential]] host/user/password records.
    #[arg(long)]
    pub credentials: Option<PathBuf>,
    /// Control API port.
    #[arg(long)]
    pub port: Option<u16>,
    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Accept self-signed control API certificates.
    #[arg(long)]
    pub insecure: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Write each server's merged documents as <dir>/<server>-<family>.json.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    #[arg(long)]
    pub inventory: Option<PathBuf>,
    /// Also compute the subnets each server would serve.
    #[arg(long)]
    pub subnets: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
