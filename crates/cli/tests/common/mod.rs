//! Common utilities for integration tests

pub mod cli;

use std::fs;
use std::path::{Path, PathBuf};

/// Write `fmon.conf` into `dir` with a private pid file and one watcher
///
/// `watcher_body` is appended to the `[watcher.data]` table, after its
/// `path` key.
pub fn write_config(dir: &Path, watcher_body: &str) -> PathBuf {
    let data = dir.join("data");
    fs::create_dir_all(&data).unwrap();

    let config = format!(
        "[main]\npid_file = \"{}\"\nlog_file = \"{}\"\n\n[watcher.data]\npath = \"{}\"\n{}\n",
        dir.join("fmon.pid").display(),
        dir.join("fmon.log").display(),
        data.display(),
        watcher_body
    );

    let file = dir.join("fmon.conf");
    fs::write(&file, config).unwrap();
    file
}
