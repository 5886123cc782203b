use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rsvp_core::{
    directory::validate_guest_record,
    export::{export_csv, local_timestamp, ExportOptions, EXPORT_FILENAME},
    summary::{summary_lines, AdminSnapshot},
};
use shared::domain::{Guest, GuestId};
use storage::Storage;
use tracing::info;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/rsvp.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Adds or replaces one directory entry.
    AddGuest {
        id: String,
        name: String,
        email: String,
        #[arg(long)]
        plus_one: Option<String>,
    },
    /// Loads a JSON array of `{id, name, email, plusOne?}` records.
    ImportGuests { path: PathBuf },
    ListGuests,
    ListResponses {
        #[arg(long, default_value_t = 0)]
        utc_offset_minutes: i32,
    },
    Summary,
    ExportCsv {
        #[arg(long, default_value = EXPORT_FILENAME)]
        output: PathBuf,
        #[arg(long, default_value_t = 0)]
        utc_offset_minutes: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();
    let storage = Storage::new(&cli.database_url).await?;

    match cli.command {
        Command::AddGuest {
            id,
            name,
            email,
            plus_one,
        } => {
            let guest = Guest {
                id: GuestId(id),
                name,
                email,
                plus_one,
            };
            validate_guest_record(&guest).map_err(|e| anyhow!(e))?;
            storage.upsert_guest(&guest).await?;
            println!("stored guest id={}", guest.id);
        }
        Command::ImportGuests { path } => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            let guests: Vec<Guest> = serde_json::from_str(&raw)
                .with_context(|| format!("'{}' is not a JSON array of guests", path.display()))?;
            for guest in &guests {
                validate_guest_record(guest).map_err(|e| anyhow!(e))?;
            }
            storage.upsert_guests(&guests).await?;
            info!(count = guests.len(), path = %path.display(), "guests imported");
            println!("imported {} guests", guests.len());
        }
        Command::ListGuests => {
            for guest in storage.list_guests().await? {
                match &guest.plus_one {
                    Some(plus_one) => println!(
                        "{}\t{}\t{}\t+ {plus_one}",
                        guest.id, guest.name, guest.email
                    ),
                    None => println!("{}\t{}\t{}", guest.id, guest.name, guest.email),
                }
            }
        }
        Command::ListResponses { utc_offset_minutes } => {
            let offset = ExportOptions { utc_offset_minutes }.offset();
            for stored in storage.list_responses().await? {
                let r = stored.response;
                println!(
                    "#{}\t{}\t{}\twelcome={} wedding={} farewell={}\tentree={}\tnote={}",
                    stored.response_id.0,
                    local_timestamp(r.timestamp, offset),
                    r.guest_name,
                    r.welcome_event.as_str(),
                    r.wedding.as_str(),
                    r.farewell_event.as_str(),
                    r.entree_choice.map(|e| e.as_str()).unwrap_or("-"),
                    r.note.as_deref().unwrap_or("-"),
                );
            }
        }
        Command::Summary => {
            let snapshot = load_snapshot(&storage).await?;
            for line in summary_lines(&snapshot.summary) {
                println!("{line}");
            }
        }
        Command::ExportCsv {
            output,
            utc_offset_minutes,
        } => {
            let snapshot = load_snapshot(&storage).await?;
            let csv = export_csv(&snapshot.responses, &ExportOptions { utc_offset_minutes });
            fs::write(&output, csv)
                .with_context(|| format!("failed to write '{}'", output.display()))?;
            println!(
                "wrote {} responses to {}",
                snapshot.responses.len(),
                output.display()
            );
        }
    }

    Ok(())
}

async fn load_snapshot(storage: &Storage) -> Result<AdminSnapshot> {
    let responses = storage
        .list_responses()
        .await?
        .into_iter()
        .map(|stored| stored.response)
        .collect();
    Ok(AdminSnapshot::new(responses, Utc::now()))
}
