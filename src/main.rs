use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use dotenv::dotenv;
use tokio::fs;
use tracing::Level;

use screener::config::{ConfigLoader, Settings};

#[derive(Parser)]
#[command(version, about = "Demo screening provider with HTTP signature authentication")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Read configuration from SCREENER_* environment variables instead of a file
    #[arg(long)]
    from_env: bool,

    /// Print the supported environment variables and exit
    #[arg(long)]
    config_help: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    if cli.config_help {
        ConfigLoader::print_help();
        return Ok(());
    }

    let settings: Settings = if cli.from_env {
        ConfigLoader::load()?
    } else {
        let config_file_config = String::from_utf8(fs::read(&cli.config).await?)?;
        toml::from_str(&config_file_config)?
    };

    ConfigLoader::validate(&settings)?;

    tracing_subscriber::fmt()
        .with_max_level(Level::from_str(&settings.log_level)?)
        .with_level(true)
        .with_thread_names(true)
        .with_target(true)
        .init();

    screener::screener::run(settings.screener).await
}
