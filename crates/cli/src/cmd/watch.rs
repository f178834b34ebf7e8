//! Run a single watcher defined on the command line

use anyhow::Result;
use clap::Args;
use fmon_core::config::ADHOC_WATCHER;
use fmon_core::{Config, WatcherConfig};
use std::path::PathBuf;

/// Watcher options, mirroring the `[watcher.NAME]` keys
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// File or directory to watch
    #[arg(short, long)]
    path: PathBuf,

    /// Watch subdirectories too
    #[arg(short, long)]
    recursive: bool,

    /// Maximum depth of recursion (0 = unlimited)
    #[arg(short = 'd', long, default_value_t = 0)]
    maxdepth: u32,

    /// Events to report (comma list; default: all)
    #[arg(short, long, value_delimiter = ',')]
    event: Vec<String>,

    /// Stay on the filesystem of the watched path
    #[arg(long)]
    mount: bool,

    /// Only files readable by this process
    #[arg(long)]
    readable: bool,

    /// Only files writable by this process
    #[arg(long)]
    writable: bool,

    /// Only files executable by this process
    #[arg(long)]
    executable: bool,

    /// Size predicate, e.g. +2k, -1M, =0
    #[arg(long, allow_hyphen_values = true)]
    size: Option<String>,

    /// File type: b c d p f l s
    #[arg(short = 't', long = "type")]
    file_type: Option<String>,

    /// Owning user, name or id
    #[arg(long)]
    user: Option<String>,

    /// Owning group, name or id
    #[arg(long)]
    group: Option<String>,

    /// Glob patterns a file name must match (comma list)
    #[arg(short, long, value_delimiter = ',')]
    include: Vec<String>,

    /// Glob patterns to ignore (comma list)
    #[arg(short = 'x', long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Command run for each event ($name $path $event $file $rfile)
    #[arg(long)]
    exec: Option<String>,

    /// Print the path of each event, newline terminated
    #[arg(long)]
    print: bool,

    /// Print the path of each event, NUL terminated
    #[arg(long)]
    print0: bool,
}

impl From<WatchArgs> for WatcherConfig {
    fn from(args: WatchArgs) -> Self {
        WatcherConfig {
            path: Some(args.path),
            recursive: args.recursive,
            max_depth: args.maxdepth,
            events: args.event,
            mount: args.mount,
            readable: args.readable,
            writable: args.writable,
            executable: args.executable,
            size: args.size,
            file_type: args.file_type,
            user: args.user,
            group: args.group,
            include: args.include,
            exclude: args.exclude,
            exec: args.exec,
            print: args.print,
            print0: args.print0,
        }
    }
}

pub async fn run(args: WatchArgs, verbose: bool) -> Result<()> {
    let raw = WatcherConfig::from(args);
    let config = Config::adhoc(raw.clone())?;

    crate::logging::init_foreground(verbose)?;

    // reload re-validates the same options
    let loader = move || raw.clone().validate(ADHOC_WATCHER).map(|spec| vec![spec]);

    crate::daemon::run(config, loader, false).await
}
