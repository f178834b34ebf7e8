//! fmon - watch directory trees and act on file events

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod cmd;
mod daemon;
mod error;
mod logging;
mod pidfile;
mod util;

use cmd::config::ConfigCommand;
use cmd::signal::Request;
use cmd::watch::WatchArgs;

/// fmon - File system monitor running commands on file events
#[derive(Parser)]
#[command(name = "fmon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single watcher defined on the command line
    Watch(WatchArgs),
    /// Run the watchers of the configuration file
    Start {
        /// Configuration file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Stay in the foreground even when daemonize is set
        #[arg(long)]
        foreground: bool,

        #[arg(long, hide = true)]
        detached: bool,
    },
    /// Stop the running daemon
    Stop {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Make the running daemon re-read its configuration
    Reload {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Stop all watchers of the running daemon
    Pause {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Restart all watchers of the running daemon
    Resume {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Show daemon status
    Status {
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,

        #[arg(short, long, global = true)]
        file: Option<PathBuf>,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let verbose = cli.verbose;

    match cli.command {
        Commands::Watch(args) => cmd::watch::run(args, verbose).await,
        Commands::Start { file, foreground, detached } => cmd::start::run(file, foreground, detached, verbose).await,
        Commands::Stop { file } => cmd::signal::run(file, Request::Stop).await,
        Commands::Reload { file } => cmd::signal::run(file, Request::Reload).await,
        Commands::Pause { file } => cmd::signal::run(file, Request::Pause).await,
        Commands::Resume { file } => cmd::signal::run(file, Request::Resume).await,
        Commands::Status { file } => cmd::status::run(file).await,
        Commands::Config { command, file } => cmd::config::run(command, file).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fmon: {:#}", e);
            ExitCode::from(error::exit_status(&e))
        }
    }
}
