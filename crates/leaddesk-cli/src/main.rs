//! LeadDesk CLI - a terminal front end for the LeadDesk dashboard API.
//!
//! Logs in, keeps the session on disk and prints dashboard, admin, sales,
//! analytics and agent fleet data as JSON.

mod commands;
mod shell;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use leaddesk_core::api::ApiFamily;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shell::Shell;

#[derive(Parser)]
#[command(name = "leaddesk")]
#[command(about = "LeadDesk CLI - leads, bookings, campaigns and agent fleet from the terminal", long_about = None)]
struct Cli {
    /// API base URL (overrides config and LEADDESK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the stored session
    Whoami,
    /// GET a path within an API family and print the JSON
    Get {
        family: ApiFamily,
        #[arg(default_value = "")]
        path: String,
    },
    /// Dashboard overview and system health, fetched side by side
    Overview,
    /// Poll a path within an API family
    Watch {
        family: ApiFamily,
        #[arg(default_value = "")]
        path: String,
        /// Seconds between calls
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing(log_file: Option<&PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Log file path has no file name"))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_ref())?;
    info!("LeadDesk CLI starting");

    let mut shell = Shell::new(cli.api_url.as_deref())?;

    match cli.command {
        Commands::Login { email } => shell.login(email).await?,
        Commands::Logout => commands::logout(&shell)?,
        Commands::Whoami => commands::whoami(&shell)?,
        Commands::Get { family, path } => {
            let result = commands::get(&shell, family, &path).await;
            shell.finish(result).await?
        }
        Commands::Overview => {
            let result = commands::overview(&shell).await;
            shell.finish(result).await?
        }
        Commands::Watch {
            family,
            path,
            interval,
        } => commands::watch(&mut shell, family, &path, interval).await?,
    }

    Ok(())
}
