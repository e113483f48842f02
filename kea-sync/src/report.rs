use colored::Colorize;
use kea_config_core::{format_text, DiffEntry, Subnet};

use crate::discovery::ServerListing;
use crate::sync::{FamilyState, RunReport, ServerOutcome};

/// Render diff entries for terminal output.
pub fn render_text(entries: &[DiffEntry]) -> String {
    let raw = format_text(entries);
    let mut out = Vec::new();

    for line in raw.lines() {
        let colored = if line.starts_with('+') {
            line.green().to_string()
        } else if line.starts_with('-') {
            line.red().to_string()
        } else if line.starts_with('~') {
            line.yellow().to_string()
        } else if line.starts_with('!') {
            line.magenta().to_string()
        } else {
            line.to_string()
        };
        out.push(colored);
    }

    out.join("\n")
}

/// Render a run report, one block per server.
pub fn render_run(report: &RunReport) -> String {
    let mut out = Vec::new();
    for server in &report.servers {
        out.push(render_server(server));
    }

    let failed = report.failed_servers();
    let total = report.servers.len();
    let summary = format!("servers={total} ok={} failed={failed}", total - failed);
    out.push(if failed == 0 {
        summary.cyan().to_string()
    } else {
        summary.red().to_string()
    });
    out.join("\n")
}

fn render_server(server: &ServerOutcome) -> String {
    let mut lines = Vec::new();
    let status = if server.is_success() {
        "OK".green()
    } else {
        "FAILED".red()
    };
    lines.push(format!(
        "{status} {} stage={:?} interfaces=[{}]",
        server.server.bold(),
        server.stage,
        server.interfaces.join(",")
    ));

    if let Some(error) = &server.error {
        let after = server
            .failed_after
            .map(|stage| format!(" after {stage:?}"))
            .unwrap_or_default();
        lines.push(format!("  error{after}: [{}] {}", error.kind, error.message).red().to_string());
    }

    for family in &server.families {
        let line = match &family.state {
            FamilyState::Persisted { path } => {
                format!("  {}: persisted to {}", family.family, path.display()).green()
            }
            FamilyState::SubmitFailed { failure } => {
                format!("  {}: submit failed: {}", family.family, failure.message).red()
            }
            FamilyState::PersistFailed { failure } => {
                format!("  {}: persist failed: {}", family.family, failure.message).red()
            }
            FamilyState::Planned { changes } => {
                let changed = changes.iter().filter(|c| c.is_change()).count();
                let header = format!("  {}: {} planned change(s)", family.family, changed).yellow();
                if changes.is_empty() {
                    header
                } else {
                    let body = render_text(changes)
                        .lines()
                        .map(|line| format!("    {line}"))
                        .collect::<Vec<_>>()
                        .join("\n");
                    format!("{header}\n{body}").normal()
                }
            }
        };
        lines.push(line.to_string());
    }
    lines.join("\n")
}

/// Render discovered servers and, when computed, their subnets.
pub fn render_listing(listings: &[ServerListing]) -> String {
    let mut out = Vec::new();
    for listing in listings {
        match (&listing.record, &listing.error) {
            (Some(record), _) => {
                let interfaces: Vec<&str> = record.interfaces.iter().map(String::as_str).collect();
                out.push(format!(
                    "{} service={} interfaces=[{}]",
                    listing.device.bold(),
                    record.service.id,
                    interfaces.join(",")
                ));
            }
            (None, Some(error)) => {
                out.push(format!("{} [{}] {}", listing.device.bold(), error.kind, error.message).red().to_string());
            }
            (None, None) => out.push(listing.device.clone()),
        }

        if let Some(subnets) = &listing.subnets {
            for (label, list) in [("subnet4", &subnets.dhcp4), ("subnet6", &subnets.dhcp6)] {
                for subnet in list {
                    out.push(format!("  {label} {}", render_subnet(subnet)));
                }
            }
        }
    }
    out.join("\n")
}

fn render_subnet(subnet: &Subnet) -> String {
    let pools: Vec<&str> = subnet.pools.iter().map(|p| p.pool.as_str()).collect();
    let mut line = format!("id={} {} pools=[{}]", subnet.id, subnet.subnet, pools.join(", "));
    for option in &subnet.option_data {
        line.push_str(&format!(" {}={}", option.name, option.data));
    }
    line
}
