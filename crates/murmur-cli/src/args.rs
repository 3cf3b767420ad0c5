//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "murmur",
    version,
    about = "Push-to-talk dictation for the terminal",
    long_about = "Record speech, send it to a transcription server, and print the result.\n\
                  Running murmur with no subcommand records once."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record once and transcribe through the configured server
    Record(RecordArgs),
    /// Transcribe live with the on-device engine
    Live(LiveArgs),
    /// List audio input devices
    Devices,
    /// List or install recognition model packs
    Packs {
        #[command(subcommand)]
        command: Option<PacksCommand>,
    },
    /// Show or change settings
    Config(ConfigArgs),
}

#[derive(Args, Default)]
pub struct RecordArgs {
    /// Input device name (as shown by `murmur devices`)
    #[arg(long)]
    pub device: Option<String>,

    /// Transcription server base URL
    #[arg(long)]
    pub server_url: Option<String>,

    /// Save the transcript file without asking
    #[arg(long, conflicts_with = "no_save")]
    pub save: bool,

    /// Never save the transcript file, never ask
    #[arg(long)]
    pub no_save: bool,
}

#[derive(Args, Default)]
pub struct LiveArgs {
    /// Input device name (as shown by `murmur devices`)
    #[arg(long)]
    pub device: Option<String>,

    /// Model pack to transcribe with
    #[arg(long)]
    pub pack: Option<String>,

    /// Language code, e.g. "en"
    #[arg(long)]
    pub language: Option<String>,
}

#[derive(Subcommand)]
pub enum PacksCommand {
    /// Show known packs and their install status
    List,
    /// Download and install a pack
    Install {
        /// Pack name, e.g. "small"
        name: String,
    },
}

#[derive(Args)]
pub struct ConfigArgs {
    /// Set the transcription server base URL
    #[arg(long)]
    pub server_url: Option<String>,

    /// Set the language code
    #[arg(long)]
    pub language: Option<String>,

    /// Set the default model pack for live mode
    #[arg(long)]
    pub pack: Option<String>,

    /// Pin an input device by name
    #[arg(long)]
    pub device: Option<String>,

    /// Go back to the system default input device
    #[arg(long, conflicts_with = "device")]
    pub clear_device: bool,
}
