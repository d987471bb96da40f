//! Jellybridge CLI - Host adapter and diagnostics for playback tracking
//!
//! Features:
//! - EDL sidecar decoding and outro lookup
//! - Replaying scripted host traces through the playback tracker
//! - Printing the effective tracker configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use url::Url;

mod commands;
mod output;
mod scripted;

/// Jellybridge CLI - Jellyfin playback tracking toolkit
#[derive(Parser)]
#[command(name = "jellybridge")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Jellyfin playback session tracking toolkit", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Tracker configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the EDL sidecar of a media file
    Edl {
        /// Path to the media file (the .edl sidecar sits next to it)
        media: String,

        /// Total duration in seconds, to compute the outro time
        #[arg(short, long)]
        total: Option<i64>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Drive the tracker from a scripted host trace
    Replay {
        /// Trace file (JSON)
        trace: PathBuf,

        /// Jellyfin server address; remote calls are only logged without it
        #[arg(long)]
        server: Option<Url>,

        /// Access token
        #[arg(long, requires = "server")]
        token: Option<String>,

        /// User id
        #[arg(long, requires = "server")]
        user_id: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the effective tracker configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    match cli.log_format.as_str() {
        "json" => tracing_subscriber::fmt()
            .json()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .init(),
        _ => tracing_subscriber::fmt()
            .with_env_filter(level)
            .with_writer(std::io::stderr)
            .init(),
    }
    jellybridge_core::init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Edl { media, total, format } => {
            commands::edl(&media, total, &format).await?;
        }
        Commands::Replay { trace, server, token, user_id, format } => {
            let server = server.map(|address| commands::RemoteTarget {
                address,
                token: token.unwrap_or_default(),
                user_id: user_id.unwrap_or_default(),
            });
            commands::replay(&trace, config, server, &format).await?;
        }
        Commands::Config => {
            commands::show_config(&config)?;
        }
    }

    Ok(())
}
