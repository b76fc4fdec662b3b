use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizdesk::cli::{self, Cli, Commands};
use quizdesk::config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizdesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        return cli::commands::init().await;
    }

    let config = match &cli.config {
        Some(path) => config::load_config_from_path(path)?,
        None => config::load_config()?,
    };

    match cli.command {
        Commands::Init => Ok(()),
        Commands::Login { email, password } => cli::commands::login(&config, email, password).await,
        Commands::Logout => cli::commands::logout(&config).await,
        Commands::Whoami { format } => cli::commands::whoami(&config, format).await,
        Commands::Open { route, allow } => cli::commands::open(&config, &route, allow).await,
        Commands::Decode { token, format } => cli::commands::decode(&token, format).await,
        Commands::Fetch { path, allow } => cli::commands::fetch(&config, &path, allow).await,
    }
}
