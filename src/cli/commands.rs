//! CLI subcommands: serve, init, config, and config loading.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Config;

/// Load configuration from file or defaults
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

/// Apply command-line overrides and run the server
pub(crate) async fn cmd_serve(
    mut config: Config,
    bind: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    config.validate().context("Invalid configuration")?;

    tracing::info!(
        "Starting voicerelay {} (chat model: {}, voice: {})",
        crate::VERSION,
        config.chat.model,
        config.speech.voice_id
    );

    crate::server::serve(&config).await
}

/// Write a default configuration file to `path` (or ./voicerelay.toml)
pub(crate) fn cmd_init(path: Option<&str>, force: bool) -> Result<()> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::local_config_path);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    Config::default().save(&config_path)?;

    println!("Configuration initialized at: {}", config_path.display());
    println!("\nNext steps:");
    println!("   1. Set ASSEMBLYAI_KEY, OPENROUTER_KEY and ELEVENLABS_KEY (or add them to .env)");
    println!("   2. Adjust the persona and voice in the config file if needed");
    println!("   3. Run 'voicerelay serve'");

    Ok(())
}

/// Print the effective configuration as TOML
pub(crate) fn cmd_config(config: &Config, show_secrets: bool) -> Result<()> {
    let shown = if show_secrets {
        config.clone()
    } else {
        config.redacted()
    };

    let rendered = toml::to_string_pretty(&shown).context("Failed to serialize config")?;
    println!("{}", rendered);

    let missing = config.missing_api_keys();
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|s| s.to_string()).collect();
        println!("# Missing API keys: {}", names.join(", "));
    }
    if !show_secrets {
        println!("# Use --show-secrets to display API keys");
    }

    Ok(())
}
