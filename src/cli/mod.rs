//! CLI Module
//!
//! Command-line interface for voicerelay using Clap v4.

mod commands;

pub use commands::load_config;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::Config;

/// voicerelay - speech in, spoken reply out
#[derive(Parser, Debug)]
#[command(name = "voicerelay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging for this crate
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "VOICERELAY_CONFIG")]
    pub config: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve {
        /// Bind address, overrides config and VOICERELAY_BIND
        #[arg(short, long)]
        bind: Option<String>,

        /// Listen port, overrides config and PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a default configuration file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Config {
        /// Show API keys unmasked
        #[arg(short, long)]
        show_secrets: bool,
    },
}

/// Main CLI entry point, after logging is up
pub async fn run(cli: Cli, config: Config) -> Result<()> {
    if cli.debug {
        tracing::info!("Debug mode enabled");
    }

    match cli.command {
        None => commands::cmd_serve(config, None, None).await,
        Some(Commands::Serve { bind, port }) => commands::cmd_serve(config, bind, port).await,
        Some(Commands::Init { force }) => commands::cmd_init(cli.config.as_deref(), force),
        Some(Commands::Config { show_secrets }) => commands::cmd_config(&config, show_secrets),
    }
}
