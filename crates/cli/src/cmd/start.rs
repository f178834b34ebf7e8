//! Start the configured watchers

use crate::error::CliError;
use crate::{logging, pidfile, util};
use anyhow::{Context, Result};
use fmon_core::Config;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub async fn run(file: Option<PathBuf>, foreground: bool, detached: bool, verbose: bool) -> Result<()> {
    let file = util::resolve_config_file(file.as_deref())?;
    let config = Config::load(&file).with_context(|| format!("Failed to load {}", file.display()))?;

    if detached {
        let _guard = logging::init_detached(&config.main)?;
        return crate::daemon::run(config, loader(file), true).await;
    }

    if config.main.daemonize && !foreground {
        return start_background(&file, &config.main.pid_file).await;
    }

    logging::init_foreground(verbose)?;
    crate::daemon::run(config, loader(file), false).await
}

/// Reload source: the same file, validated afresh
fn loader(file: PathBuf) -> impl FnMut() -> fmon_core::Result<Vec<fmon_core::WatcherSpec>> {
    move || Config::load(&file).map(|config| config.watchers)
}

async fn start_background(file: &Path, pid_file: &Path) -> Result<()> {
    use std::os::unix::process::CommandExt;
    use std::process::{Command, Stdio};

    if let Some(record) = pidfile::running(pid_file) {
        return Err(CliError::Daemon(format!("already running (pid {})", record.pid)).into());
    }

    let exe = std::env::current_exe().context("Failed to get current executable path")?;

    // own process group so the terminal's signals don't reach it
    Command::new(&exe)
        .arg("start")
        .arg("-f")
        .arg(file)
        .arg("--detached")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()
        .map_err(|e| CliError::Daemon(format!("failed to spawn daemon process: {}", e)))?;

    // Wait a moment to verify it started
    tokio::time::sleep(Duration::from_millis(500)).await;

    match pidfile::running(pid_file) {
        Some(record) => {
            println!("fmon started (pid {})", record.pid);
            Ok(())
        }
        None => Err(CliError::Daemon(format!("daemon failed to start (pid file {})", pid_file.display())).into()),
    }
}
