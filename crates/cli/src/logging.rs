//! Logger initialisation
//!
//! Foreground runs log to stderr. Detached daemons log to syslog when
//! `main.use_syslog` is set, otherwise to `main.log_file` through a
//! non-blocking writer; the returned guard must live as long as the process
//! so buffered lines get flushed.

use crate::error::CliError;
use fmon_core::{MainConfig, SyslogFacility};
use std::ffi::CString;
use syslog_tracing::{Facility, Options, Syslog};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins over the computed default
fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Log to stderr, errors only unless verbose
pub fn init_foreground(verbose: bool) -> Result<(), CliError> {
    let level = if verbose { "debug" } else { "error" };

    tracing_subscriber::registry()
        .with(filter(level))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| CliError::Logger(e.to_string()))
}

/// Log to syslog or the configured file at the configured level
///
/// The guard is `None` when logging to syslog.
pub fn init_detached(main: &MainConfig) -> Result<Option<WorkerGuard>, CliError> {
    if main.use_syslog {
        init_syslog(main)?;
        return Ok(None);
    }

    let path = &main.log_file;
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => std::path::Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| CliError::Logger(format!("{}: not a file name", path.display())))?;

    std::fs::create_dir_all(dir).map_err(|e| CliError::Logger(format!("{}: {}", dir.display(), e)))?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    tracing_subscriber::registry()
        .with(filter(main.log_level.as_directive()))
        .with(fmt::layer().with_target(false).with_ansi(false).with_writer(writer))
        .try_init()
        .map_err(|e| CliError::Logger(e.to_string()))?;

    Ok(Some(guard))
}

fn init_syslog(main: &MainConfig) -> Result<(), CliError> {
    let identity = CString::new("fmon").map_err(|e| CliError::Logger(e.to_string()))?;
    let syslog = Syslog::new(identity, Options::default(), facility(main.syslog_facility))
        .ok_or_else(|| CliError::Logger("syslog connection already open".to_string()))?;

    // syslog stamps each line itself
    tracing_subscriber::registry()
        .with(filter(main.log_level.as_directive()))
        .with(fmt::layer().with_target(false).with_ansi(false).without_time().with_writer(syslog))
        .try_init()
        .map_err(|e| CliError::Logger(e.to_string()))
}

fn facility(facility: SyslogFacility) -> Facility {
    match facility {
        SyslogFacility::User => Facility::User,
        SyslogFacility::Daemon => Facility::Daemon,
        SyslogFacility::Local0 => Facility::Local0,
        SyslogFacility::Local1 => Facility::Local1,
        SyslogFacility::Local2 => Facility::Local2,
        SyslogFacility::Local3 => Facility::Local3,
        SyslogFacility::Local4 => Facility::Local4,
        SyslogFacility::Local5 => Facility::Local5,
        SyslogFacility::Local6 => Facility::Local6,
        SyslogFacility::Local7 => Facility::Local7,
    }
}
