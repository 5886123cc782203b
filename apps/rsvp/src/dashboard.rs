use std::{fs, time::Duration};

use anyhow::{Context, Result};
use chrono::FixedOffset;
use client_core::{AdminClient, AdminDashboard, EventSubscription};
use rsvp_core::{
    export::{local_timestamp, ExportOptions},
    summary::{summary_lines, AdminSnapshot},
};
use shared::protocol::ServerEvent;
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

use crate::DashboardArgs;

const COLUMNS: [&str; 8] = [
    "Guest", "Email", "Welcome", "Wedding", "Entree", "Farewell", "Note", "Submitted",
];

pub(crate) fn render_table(snapshot: &AdminSnapshot, offset: FixedOffset) -> String {
    let rows: Vec<[String; 8]> = snapshot
        .responses
        .iter()
        .map(|r| {
            [
                r.guest_name.clone(),
                r.guest_email.clone(),
                r.welcome_event.attending_label().to_string(),
                r.wedding.attending_label().to_string(),
                r.entree_choice.map(|e| e.as_str()).unwrap_or("-").to_string(),
                r.farewell_event.attending_label().to_string(),
                r.note.clone().unwrap_or_else(|| "-".to_string()),
                local_timestamp(r.timestamp, offset),
            ]
        })
        .collect();

    let mut widths = COLUMNS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = table_line(COLUMNS.iter().copied(), &widths);
    out.push('\n');
    if rows.is_empty() {
        out.push_str("No RSVPs yet\n");
    }
    for row in &rows {
        out.push_str(&table_line(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out
}

fn table_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths.iter().copied())
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ")
        .trim_end()
        .to_string()
}

fn print_snapshot(snapshot: &AdminSnapshot, args: &DashboardArgs, offset: FixedOffset) {
    println!(
        "\nRSVP dashboard (as of {})",
        local_timestamp(snapshot.fetched_at, offset)
    );
    for line in summary_lines(&snapshot.summary) {
        println!("  {line}");
    }
    if args.table {
        println!();
        print!("{}", render_table(snapshot, offset));
    }
}

async fn next_push(subscription: &mut Option<EventSubscription>) -> Option<ServerEvent> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}

pub(crate) async fn run(server_url: &str, args: DashboardArgs) -> Result<()> {
    let options = ExportOptions {
        utc_offset_minutes: args.utc_offset_minutes,
    };
    let offset = options.offset();

    let mut client = AdminClient::new(server_url);
    client.login(&args.password).await?;
    let mut dashboard = AdminDashboard::new(client);
    let mut subscription = if args.watch {
        Some(dashboard.watch().await?)
    } else {
        dashboard.refresh().await?;
        None
    };
    if let Some(snapshot) = dashboard.snapshot() {
        print_snapshot(snapshot, &args, offset);
    }

    if let Some(path) = &args.export {
        let csv = dashboard.client().export_csv().await?;
        fs::write(path, csv).with_context(|| format!("failed to write '{}'", path.display()))?;
        println!("Exported responses to {}", path.display());
    }

    if args.refresh_secs.is_none() && !args.watch {
        return Ok(());
    }

    let period = Duration::from_secs(args.refresh_secs.unwrap_or(3600).max(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            _ = ticker.tick(), if args.refresh_secs.is_some() => {
                match dashboard.refresh().await {
                    Ok(snapshot) => print_snapshot(snapshot, &args, offset),
                    Err(error) if error.requires_login() => return Err(error.into()),
                    Err(error) => warn!(%error, "refresh failed; showing previous snapshot"),
                }
            }
            event = next_push(&mut subscription) => {
                let Some(event) = event else {
                    println!("Live updates disconnected.");
                    subscription = None;
                    if args.refresh_secs.is_none() {
                        return Ok(());
                    }
                    continue;
                };
                let pushed_error = matches!(event, ServerEvent::Error(_));
                if dashboard.apply_event(event) {
                    if let Some(snapshot) = dashboard.snapshot() {
                        print_snapshot(snapshot, &args, offset);
                    }
                } else if pushed_error {
                    if let Some(message) = dashboard.last_error() {
                        println!("Server: {message}");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/dashboard_tests.rs"]
mod tests;
