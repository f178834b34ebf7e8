//! Configuration file model and validation
//!
//! The file is TOML with one `[main]` table and one `[watcher.NAME]` table
//! per watcher. Validation turns each watcher table into a `WatcherSpec`;
//! nothing invalid ever leaves this module.

use crate::error::ConfigError;
use crate::patterns::PatternList;
use crate::spec::{Action, EventKind, FileType, SizePredicate, WatcherSpec};
use crate::Result;
use nix::unistd::{access, AccessFlags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Directory under `$HOME` holding the per-user configuration
pub const HOME_DIR: &str = ".fmon";

/// Configuration file name
pub const CONFIG_FILE: &str = "fmon.conf";

/// System configuration directory
pub const SYSCONF_DIR: &str = "/etc";

/// Name given to the watcher built from command-line options
pub const ADHOC_WATCHER: &str = "watcher";

/// Daemon log verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    None,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::None => "off",
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Syslog facility for detached daemons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyslogFacility {
    User,
    #[default]
    Daemon,
    Local0,
    Local1,
    Local2,
    Local3,
    Local4,
    Local5,
    Local6,
    Local7,
}

/// `[main]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MainConfig {
    /// Run detached when started through `fmon start`
    pub daemonize: bool,

    /// Pid file guarding against a second daemon
    pub pid_file: PathBuf,

    /// Drop privileges to this user when detached
    pub user: Option<String>,

    /// Drop privileges to this group when detached
    pub group: Option<String>,

    pub log_level: LogLevel,

    /// Log destination when detached and not logging to syslog
    pub log_file: PathBuf,

    /// Send detached logs to syslog instead of `log_file`
    pub use_syslog: bool,

    pub syslog_facility: SyslogFacility,

    /// Mount table polling period
    pub mount_poll_interval_ms: u64,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            daemonize: false,
            pid_file: PathBuf::from("/var/run/fmon/fmon.pid"),
            user: None,
            group: None,
            log_level: LogLevel::default(),
            log_file: PathBuf::from("/var/log/fmon/fmon.log"),
            use_syslog: false,
            syslog_facility: SyslogFacility::default(),
            mount_poll_interval_ms: 1000,
        }
    }
}

/// `[watcher.NAME]` table, before validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatcherConfig {
    pub path: Option<PathBuf>,
    pub recursive: bool,
    pub max_depth: u32,
    pub events: Vec<String>,
    pub mount: bool,
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub size: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub user: Option<String>,
    pub group: Option<String>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub exec: Option<String>,
    pub print: bool,
    pub print0: bool,
}

impl WatcherConfig {
    /// Validate into an immutable watcher rule
    pub fn validate(self, name: &str) -> Result<WatcherSpec> {
        let path = self.path.ok_or_else(|| ConfigError::MissingPath {
            watcher: name.to_string(),
        })?;

        let path = path.canonicalize().map_err(|_| ConfigError::PathNotFound {
            watcher: name.to_string(),
            path: path.clone(),
        })?;

        let is_dir = path.is_dir();
        let required = if is_dir {
            AccessFlags::R_OK | AccessFlags::X_OK
        } else {
            AccessFlags::R_OK
        };
        if access(&path, required).is_err() {
            return Err(ConfigError::BadPermissions {
                watcher: name.to_string(),
                path,
            });
        }

        if self.recursive && !is_dir {
            return Err(ConfigError::NotADirectory {
                watcher: name.to_string(),
            });
        }

        let mut events = Vec::with_capacity(self.events.len());
        for event in &self.events {
            let kind: EventKind = event.trim().parse().map_err(|_| ConfigError::InvalidEvent {
                watcher: name.to_string(),
                event: event.clone(),
            })?;
            if !events.contains(&kind) {
                events.push(kind);
            }
        }

        let file_type = match self.file_type {
            Some(value) => Some(value.parse::<FileType>().map_err(|_| ConfigError::InvalidType {
                watcher: name.to_string(),
                value,
            })?),
            None => None,
        };

        let size = match self.size {
            Some(value) => Some(value.parse::<SizePredicate>().map_err(|_| ConfigError::InvalidSize {
                watcher: name.to_string(),
                value,
            })?),
            None => None,
        };

        let compile = |patterns: Vec<String>| {
            PatternList::new(patterns).map_err(|(pattern, source)| ConfigError::InvalidPattern {
                watcher: name.to_string(),
                pattern,
                source,
            })
        };
        let include = compile(self.include)?;
        let exclude = compile(self.exclude)?;

        Ok(WatcherSpec {
            name: name.to_string(),
            path,
            recursive: self.recursive,
            max_depth: if self.recursive { self.max_depth } else { 0 },
            mount: self.mount,
            readable: self.readable,
            writable: self.writable,
            executable: self.executable,
            size,
            file_type,
            user: self.user.filter(|u| !u.is_empty()),
            group: self.group.filter(|g| !g.is_empty()),
            events,
            include,
            exclude,
            action: Action {
                exec: self.exec.filter(|e| !e.trim().is_empty()),
                print: self.print,
                print0: self.print0,
            },
        })
    }
}

/// Raw file layout
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    main: MainConfig,

    #[serde(default)]
    watcher: BTreeMap<String, WatcherConfig>,
}

/// A fully validated configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub main: MainConfig,
    /// Watchers ordered by name
    pub watchers: Vec<WatcherSpec>,
}

impl Config {
    /// Read and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate configuration text
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(text)?;

        if file.watcher.is_empty() {
            return Err(ConfigError::NoWatchers);
        }

        let watchers = file
            .watcher
            .into_iter()
            .map(|(name, raw)| raw.validate(&name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            main: file.main,
            watchers,
        })
    }

    /// Read only the `[main]` table, leaving watcher tables unvalidated
    pub fn load_main(path: &Path) -> Result<MainConfig> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ConfigFile = toml::from_str(&text)?;
        Ok(file.main)
    }

    /// Configuration holding a single command-line watcher
    pub fn adhoc(raw: WatcherConfig) -> Result<Self> {
        Ok(Self {
            main: MainConfig::default(),
            watchers: vec![raw.validate(ADHOC_WATCHER)?],
        })
    }
}

/// Resolve the configuration file to use
///
/// An explicit file wins when readable; otherwise `$HOME/.fmon/fmon.conf`,
/// then `/etc/fmon.conf`. Returns `None` when none is readable.
pub fn default_config_file(explicit: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    let readable = |p: &Path| access(p, AccessFlags::R_OK).is_ok();

    if let Some(file) = explicit {
        return readable(file).then(|| file.to_path_buf());
    }

    if let Some(home) = home {
        let candidate = home.join(HOME_DIR).join(CONFIG_FILE);
        if readable(&candidate) {
            return Some(candidate);
        }
    }

    let system = Path::new(SYSCONF_DIR).join(CONFIG_FILE);
    readable(&system).then_some(system)
}

/// Example configuration, printed by `fmon config example`
pub fn example_config() -> &'static str {
    r#"# fmon configuration

[main]
daemonize = false
pid_file = "/var/run/fmon/fmon.pid"
log_level = "info"
log_file = "/var/log/fmon/fmon.log"
use_syslog = false
syslog_facility = "daemon"
mount_poll_interval_ms = 1000

# Print every new file dropped into /tmp
[watcher.tmp]
path = "/tmp"
events = ["created"]
type = "f"
exclude = ["*.swp", "*~"]
print = true

# Log large uploads anywhere below /srv/upload
# [watcher.uploads]
# path = "/srv/upload"
# recursive = true
# max_depth = 4
# events = ["changing"]
# size = "+10M"
# exec = "logger -t fmon $name: $event $rfile"
"#
}
