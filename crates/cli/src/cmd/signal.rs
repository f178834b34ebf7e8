//! Control a running daemon through signals

use crate::error::CliError;
use crate::{pidfile, util};
use anyhow::{Context, Result};
use fmon_core::Config;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Requests understood by the daemon's signal handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Stop,
    Reload,
    Pause,
    Resume,
}

impl Request {
    fn signal(self) -> Signal {
        match self {
            Request::Stop => Signal::SIGTERM,
            Request::Reload => Signal::SIGHUP,
            Request::Pause => Signal::SIGUSR2,
            Request::Resume => Signal::SIGUSR1,
        }
    }

    fn done(self) -> &'static str {
        match self {
            Request::Stop => "stopped",
            Request::Reload => "reloading configuration",
            Request::Pause => "paused",
            Request::Resume => "resumed",
        }
    }
}

pub async fn run(file: Option<PathBuf>, request: Request) -> Result<()> {
    let file = util::resolve_config_file(file.as_deref())?;
    let main = Config::load_main(&file).with_context(|| format!("Failed to load {}", file.display()))?;

    let record = pidfile::running(&main.pid_file).ok_or(CliError::NotRunning)?;
    let pid = Pid::from_raw(i32::try_from(record.pid).context("Invalid pid in pid file")?);

    kill(pid, request.signal()).with_context(|| format!("Failed to signal pid {}", record.pid))?;

    if request == Request::Stop {
        wait_for_exit(record.pid, Duration::from_secs(5)).await?;
    }

    println!("fmon {} (pid {})", request.done(), record.pid);
    Ok(())
}

async fn wait_for_exit(pid: u32, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;

    while pidfile::is_process_alive(pid) {
        if Instant::now() >= deadline {
            anyhow::bail!("fmon (pid {}) did not exit within {} seconds", pid, timeout.as_secs());
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Ok(())
}
