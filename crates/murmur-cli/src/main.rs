mod app;
mod args;
mod commands;
mod surface;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout belongs to the transcript.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("murmur=info,murmur_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = args::Cli::parse();
    let command = cli
        .command
        .unwrap_or(args::Command::Record(args::RecordArgs::default()));

    match command {
        args::Command::Record(record_args) => commands::record::run(record_args).await,
        args::Command::Live(live_args) => commands::live::run(live_args).await,
        args::Command::Devices => commands::devices::run(),
        args::Command::Packs { command } => commands::packs::run(command).await,
        args::Command::Config(config_args) => commands::config::run(config_args),
    }
}
