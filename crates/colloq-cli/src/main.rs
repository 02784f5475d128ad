use anyhow::Result;
use clap::{Parser, Subcommand};
use colloq_infrastructure::ConfigService;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "colloq")]
#[command(about = "Colloq CLI - telemetry and optimistic session cache for chat clients", long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a simulated chat against the in-memory backend and print the metrics export
    Demo {
        /// Number of messages to send
        #[arg(long, default_value_t = 3)]
        messages: usize,
        /// Simulated network latency per request, in milliseconds
        #[arg(long, default_value_t = 25)]
        latency_ms: u64,
        /// Make the second send fail with a server error
        #[arg(long)]
        fail: bool,
        /// Write the export to this file instead of stdout
        #[arg(long, conflicts_with = "save")]
        output: Option<PathBuf>,
        /// Write the export to a timestamped file in the exports directory
        #[arg(long)]
        save: bool,
    },
    /// Inspect or initialize the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Print the configuration file location
    Path,
    /// Write the default configuration if no file exists
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config_service = match cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    };

    match cli.command {
        Commands::Demo {
            messages,
            latency_ms,
            fail,
            output,
            save,
        } => {
            let output = match (output, save) {
                (Some(path), _) => Some(path),
                (None, true) => Some(commands::demo::default_export_path()?),
                (None, false) => None,
            };
            let options = commands::demo::DemoOptions {
                messages,
                latency_ms,
                fail,
                output,
            };
            commands::demo::run(config_service.get_config(), options).await?
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config_service)?,
            ConfigAction::Path => commands::config::path(&config_service)?,
            ConfigAction::Init => commands::config::init(&config_service)?,
        },
    }

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
