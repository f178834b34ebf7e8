//! Startup failures and their exit statuses

use fmon_core::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that map to a dedicated exit status
#[derive(Debug, Error)]
pub enum CliError {
    #[error("no configuration file found (tried {})", .0.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    NoConfigFile(Vec<PathBuf>),

    #[error("unable to initialise logger: {0}")]
    Logger(String),

    #[error("unable to start daemon: {0}")]
    Daemon(String),

    #[error("fmon is not running")]
    NotRunning,
}

/// Exit status for a failed command
///
/// 2: configuration file unreadable or malformed, 3: invalid watcher,
/// 4: logger, 5: daemon, 1: anything else.
pub fn exit_status(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(config) = cause.downcast_ref::<ConfigError>() {
            return if config.is_file_error() { 2 } else { 3 };
        }
        if let Some(cli) = cause.downcast_ref::<CliError>() {
            return match cli {
                CliError::NoConfigFile(_) => 2,
                CliError::Logger(_) => 4,
                CliError::Daemon(_) => 5,
                CliError::NotRunning => 1,
            };
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_status_mapping() {
        let err = anyhow::Error::new(ConfigError::NoWatchers);
        assert_eq!(exit_status(&err), 3);

        let err: anyhow::Error = Err::<(), _>(ConfigError::Read {
            path: PathBuf::from("/x"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
        .context("loading configuration")
        .unwrap_err();
        assert_eq!(exit_status(&err), 2);

        assert_eq!(exit_status(&CliError::Logger("x".into()).into()), 4);
        assert_eq!(exit_status(&CliError::Daemon("x".into()).into()), 5);
        assert_eq!(exit_status(&CliError::NoConfigFile(vec![]).into()), 2);
        assert_eq!(exit_status(&anyhow::anyhow!("other")), 1);
    }
}
