use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

mod dashboard;
mod respond;

#[derive(Parser, Debug)]
#[command(about = "Wedding RSVP guest and admin client")]
struct Cli {
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "RSVP_SERVER_URL")]
    server_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify yourself against the guest list and answer the RSVP questions.
    Respond(RespondArgs),
    /// Admin view of every response received so far.
    Dashboard(DashboardArgs),
}

#[derive(Args, Debug)]
pub(crate) struct RespondArgs {
    #[arg(long)]
    pub(crate) name: Option<String>,
    #[arg(long)]
    pub(crate) email: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct DashboardArgs {
    #[arg(long, env = "APP__ADMIN_PASSWORD", hide_env_values = true)]
    pub(crate) password: String,
    /// Print every response as a table below the summary.
    #[arg(long)]
    pub(crate) table: bool,
    /// Pull a fresh snapshot every N seconds until interrupted.
    #[arg(long)]
    pub(crate) refresh_secs: Option<u64>,
    /// Apply responses pushed by the server as they arrive.
    #[arg(long)]
    pub(crate) watch: bool,
    /// Write the CSV export to this path.
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub(crate) utc_offset_minutes: i32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();
    let cli = Cli::parse();

    match cli.command {
        Command::Respond(args) => respond::run(&cli.server_url, args).await,
        Command::Dashboard(args) => dashboard::run(&cli.server_url, args).await,
    }
}
