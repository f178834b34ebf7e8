//! Pid file management for daemon exclusivity

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Pid file held for the lifetime of the daemon
pub struct PidFile {
    path: PathBuf,
    // holds the flock
    _file: File,
}

/// Pid file content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidRecord {
    pub pid: u32,
    /// Unix time in milliseconds
    pub started_at: u64,
}

impl PidFile {
    /// Acquire the pid file
    ///
    /// Fails while another process holds the lock, whatever the file
    /// contains. A file left behind by a dead process carries no lock and
    /// is overwritten.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open pid file {}", path.display()))?;

        if !try_flock_exclusive(&file)? {
            match read_record(&mut file) {
                Ok(record) => anyhow::bail!("fmon already running (pid {}, pid file {})", record.pid, path.display()),
                Err(_) => anyhow::bail!("fmon already running (pid file {} is locked)", path.display()),
            }
        }

        if let Ok(previous) = read_record(&mut file) {
            tracing::warn!("Replacing stale pid file {} left by pid {}", path.display(), previous.pid);
        }
        write_record(&mut file)?;

        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Record of a live daemon, `None` when no daemon runs
pub fn running(path: &Path) -> Option<PidRecord> {
    let mut file = File::open(path).ok()?;
    let record = read_record(&mut file).ok()?;
    is_process_alive(record.pid).then_some(record)
}

fn write_record(file: &mut File) -> Result<()> {
    let record = PidRecord {
        pid: std::process::id(),
        started_at: crate::util::now_ms(),
    };

    let serialized = serde_json::to_string(&record).context("Failed to serialize pid file")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_record(file: &mut File) -> Result<PidRecord> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to parse pid file")
}

/// Try to acquire an exclusive file lock without blocking
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Check a process with the null signal
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    match kill(Pid::from_raw(raw), None::<Signal>) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        // EPERM: exists, owned by someone else
        Err(_) => true,
    }
}
