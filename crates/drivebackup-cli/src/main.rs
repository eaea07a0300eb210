//! drive-backup - Snapshot backups of Google Drive to local disk
//!
//! Provides commands for:
//! - Running complete, update, and increment backups
//! - Viewing, creating, editing, and validating the configuration

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod logging;
mod output;
mod progress;
mod prompt;

use commands::{backup::BackupCommand, config::ConfigCommand};
use output::{get_formatter, OutputFormat};

#[derive(Debug, Parser)]
#[command(
    name = "drive-backup",
    version,
    about = "Snapshot backups of Google Drive to local disk"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Back up a Drive folder
    Backup(BackupCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let config_path = cli.config.as_deref();

    let result = match &cli.command {
        Commands::Backup(cmd) => cmd.execute(format, config_path, cli.verbose).await,
        Commands::Config(cmd) => cmd.execute(format, config_path).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            get_formatter(format).error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
