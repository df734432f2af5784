//! Gazette CLI - Python package release newsletter generator

use clap::{Parser, Subcommand};
use gazette_lib::config::Config;
use gazette_lib::pipeline::Pipeline;
use gazette_lib::sources::{GithubClient, PypiClient};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "gazette")]
#[command(about = "Python package release newsletter generator", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "FILE", default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch releases, write the newsletter, and update dedup state
    RunOnce,

    /// Print the effective configuration and exit
    PrintConfig,
}

/// Initialize tracing subscriber from the log level flag
fn init_tracing(log_level: &str) {
    // RUST_LOG takes precedence over --log-level
    let base_filter = match std::env::var("RUST_LOG") {
        Ok(filter) => filter,
        Err(_) => log_level.to_string(),
    };

    let filter = EnvFilter::try_new(&base_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::PrintConfig => match config.to_yaml() {
            Ok(yaml) => print!("{}", yaml),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },

        Commands::RunOnce => {
            let pipeline = match Pipeline::new(config, PypiClient::new(), GithubClient::new()) {
                Ok(pipeline) => pipeline,
                Err(e) => {
                    eprintln!("Run failed: {}", e);
                    std::process::exit(1);
                }
            };

            match pipeline.run().await {
                Ok(outcome) => match &outcome.newsletter_path {
                    Some(path) => println!(
                        "Wrote {} releases to {}",
                        outcome.releases.len(),
                        path.display()
                    ),
                    None => println!("No important releases to report"),
                },
                Err(e) => {
                    eprintln!("Run failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
