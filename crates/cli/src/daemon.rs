//! Daemon lifecycle management

use crate::error::CliError;
use crate::pidfile::PidFile;
use anyhow::Result;
use fmon_core::{Config, MainConfig};
use std::time::Duration;
use tracing::info;
use watcher::{
    channel, spawn_signal_bridge, App, ControlHandle, Dispatcher, MountMonitor, NotifyBackendFactory, SpecLoader,
    SystemMountTable,
};

/// Run the watcher set until a shutdown signal arrives
///
/// A detached daemon holds the pid file for its whole lifetime, drops
/// privileges when configured to, and never prints to stdout.
pub async fn run(config: Config, loader: impl SpecLoader + 'static, detached: bool) -> Result<()> {
    let Config { main, watchers } = config;

    let _pid_file = if detached {
        let pid_file = PidFile::acquire(&main.pid_file).map_err(|e| CliError::Daemon(format!("{:#}", e)))?;
        drop_privileges(&main)?;
        Some(pid_file)
    } else {
        None
    };

    let (tx, rx) = channel();

    let mut app = App::new(
        watchers,
        Box::new(NotifyBackendFactory::new(tx.clone())),
        Box::new(SystemMountTable),
        Dispatcher::stdout(detached),
    )?
    .with_loader(loader);

    app.start();
    app.list_monitors();

    spawn_signal_bridge(ControlHandle::new(tx.clone()))
        .map_err(|e| CliError::Daemon(format!("unable to install signal handlers: {}", e)))?;

    let monitor = MountMonitor::new(
        Box::new(SystemMountTable),
        Duration::from_millis(main.mount_poll_interval_ms),
        tx,
    );
    tokio::spawn(monitor.run());

    info!(pid = std::process::id(), "fmon started");
    app.run(rx).await;
    Ok(())
}

/// Switch to the configured group, then user
fn drop_privileges(main: &MainConfig) -> Result<()> {
    use nix::unistd::{setgid, setuid, Group, User};

    if let Some(name) = &main.group {
        let group = Group::from_name(name)
            .ok()
            .flatten()
            .ok_or_else(|| CliError::Daemon(format!("unknown group '{}'", name)))?;
        setgid(group.gid).map_err(|e| CliError::Daemon(format!("unable to switch to group '{}': {}", name, e)))?;
    }

    if let Some(name) = &main.user {
        let user = User::from_name(name)
            .ok()
            .flatten()
            .ok_or_else(|| CliError::Daemon(format!("unknown user '{}'", name)))?;
        setuid(user.uid).map_err(|e| CliError::Daemon(format!("unable to switch to user '{}': {}", name, e)))?;
    }

    Ok(())
}
