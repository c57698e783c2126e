//! framedev CLI - Main Entry Point

use std::time::Duration;

use clap::{Parser, Subcommand};

use framedev_cli::client::FrameClient;
use framedev_cli::commands::{inspect, navigate, routes};
use framedev_cli::output::{self, print_error, print_success};

/// framedev - inspector for frame-protocol applications
#[derive(Parser)]
#[command(name = "framedev")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Resolver API of a running devtools server
    #[arg(
        long,
        env = "FRAMEDEV_API",
        default_value = "http://127.0.0.1:5173/dev/api",
        global = true
    )]
    api: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    timeout: u64,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List frame routes of the inspected application
    Routes(routes::RoutesArgs),

    /// Resolve a single frame
    Inspect(inspect::InspectArgs),

    /// Start an interactive navigation session
    Navigate(navigate::NavigateArgs),

    /// Check that the devtools server is reachable
    Status,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let client = FrameClient::new(&cli.api, Duration::from_secs(cli.timeout.max(1)))?;

    match cli.command {
        Commands::Routes(args) => routes::execute(args, client, cli.format).await?,
        Commands::Inspect(args) => inspect::execute(args, client, cli.format).await?,
        Commands::Navigate(args) => navigate::execute(args, client, cli.format).await?,
        Commands::Status => {
            if client.health_check().await {
                print_success(&format!("devtools API is up at {}", client.api_base()));
            } else {
                print_error(&format!("devtools API is not responding at {}", client.api_base()));
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("framedev v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
