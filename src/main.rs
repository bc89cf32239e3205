use anyhow::Result;
use clap::Parser;
use voicerelay::{cli, config::Config, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli_args = cli::Cli::parse();

    // Config loading runs before the configured subscriber exists
    let bootstrap = logging::bootstrap_subscriber(cli_args.debug, std::io::stderr);

    // `init` creates the file that --config may point at
    let config = tracing::subscriber::with_default(bootstrap, || match &cli_args.command {
        Some(cli::Commands::Init { .. }) => Ok(Config::default()),
        _ => cli::load_config(cli_args.config.as_deref()),
    })?;

    let mut log_config = logging::LogConfig::new()
        .with_level(config.logging.level.clone())
        .with_debug_mode(cli_args.debug)
        .with_json(cli_args.json_logs);
    if let Some(dir) = &config.logging.dir {
        log_config = log_config.with_log_dir(dir.clone());
    }

    let _guard = logging::init_logging(log_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    cli::run(cli_args, config).await
}
