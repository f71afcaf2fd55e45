use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tawseel::cli::{self, Cli};
use tawseel::config::{missing_api_url_banner, ConfigError, Settings};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so tables and prompts own stdout.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = match Settings::resolve(cli.api_url.clone(), cli.config.clone()) {
        Ok(settings) => settings,
        Err(ConfigError::MissingApiUrl) => {
            eprintln!("{}", missing_api_url_banner());
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("configuration error: {:#}", anyhow::Error::from(err));
            std::process::exit(2);
        }
    };

    if let Err(err) = cli::run_command(cli, settings).await {
        eprintln!("error: {:#}", err);
        std::process::exit(1);
    }
}
