use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "claude.ai plan usage in your status bar")]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Polling interval in seconds
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Poll continuously and print the indicator on every update (default)
    Watch,
    /// Fetch once and print the usage details
    Status,
    /// Validate a session key and store it in the keyring
    SetKey {
        /// Value of the `sessionKey` cookie from claude.ai; read from stdin
        /// when omitted
        key: Option<String>,
    },
    /// Remove the stored session key
    ClearKey,
    /// Write settings to the settings file, keeping values not given here
    Config {
        /// Seconds between scheduled fetches
        #[arg(long)]
        poll_interval: Option<u64>,

        /// Per-request timeout in seconds
        #[arg(long)]
        request_timeout: Option<u64>,

        /// Root of the claude.ai API
        #[arg(long)]
        base_url: Option<String>,

        /// User-Agent header sent with every request
        #[arg(long)]
        user_agent: Option<String>,
    },
}
