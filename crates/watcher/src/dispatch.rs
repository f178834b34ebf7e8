//! Action dispatch
//!
//! Commands are rendered from the watcher's template, split into arguments
//! with shell-style quoting and spawned without waiting. Printing goes to
//! the dispatcher's output and is skipped entirely when detached.

use crate::event::Event;
use fmon_core::WatcherSpec;
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::process::Stdio;
use thiserror::Error;
use tracing::{error, info};

/// Errors turning a command line into arguments
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unbalanced quote or trailing backslash in command line")]
    Unbalanced,

    #[error("empty command line")]
    Empty,
}

/// Process-spawn primitive
pub trait Spawner {
    /// Start `argv` in the background without waiting for it
    fn spawn(&self, argv: &[String]) -> io::Result<()>;
}

/// Spawns through `tokio::process`, which reaps finished children
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSpawner;

impl Spawner for TokioSpawner {
    fn spawn(&self, argv: &[String]) -> io::Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, CommandError::Empty))?;

        tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .spawn()
            .map(drop)
    }
}

pub struct Dispatcher {
    spawner: Box<dyn Spawner>,
    out: Box<dyn Write>,
    detached: bool,
}

impl Dispatcher {
    pub fn new(spawner: Box<dyn Spawner>, out: Box<dyn Write>, detached: bool) -> Self {
        Self {
            spawner,
            out,
            detached,
        }
    }

    /// Dispatcher spawning real processes and printing to stdout
    pub fn stdout(detached: bool) -> Self {
        Self::new(Box::new(TokioSpawner), Box::new(io::stdout()), detached)
    }

    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Run the action of `spec` for an accepted event
    ///
    /// Failures are logged and never propagate.
    pub fn dispatch(&mut self, spec: &WatcherSpec, event: &Event) {
        info!(watcher = %spec.name, event = %event.kind, file = %event.file.display(), "event fired");

        if let Some(template) = &spec.action.exec {
            let line = render_command(template, spec, event);
            match split_command_line(&line) {
                Ok(argv) => {
                    info!(watcher = %spec.name, command = %line, "executing command");
                    if let Err(e) = self.spawner.spawn(&argv) {
                        error!(watcher = %spec.name, command = %line, "unable to execute command: {}", e);
                    }
                }
                Err(e) => error!(watcher = %spec.name, command = %line, "unable to parse command: {}", e),
            }
        }

        if self.detached {
            return;
        }

        if let Err(e) = self.print(spec, event) {
            error!(watcher = %spec.name, "unable to write event: {}", e);
        }
    }

    fn print(&mut self, spec: &WatcherSpec, event: &Event) -> io::Result<()> {
        let path = event.file.as_os_str().as_bytes();

        if spec.action.print {
            self.out.write_all(path)?;
            self.out.write_all(b"\n")?;
        }
        if spec.action.print0 {
            self.out.write_all(path)?;
            self.out.write_all(b"\0")?;
        }

        if spec.action.print || spec.action.print0 {
            self.out.flush()?;
        }
        Ok(())
    }
}

const PLACEHOLDERS: [&str; 5] = ["name", "path", "event", "file", "rfile"];

/// Substitute `$name`, `$path`, `$event`, `$file` and `$rfile`
///
/// The template is scanned once from left to right, so text inserted for a
/// placeholder is never substituted again.
pub fn render_command(template: &str, spec: &WatcherSpec, event: &Event) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        rendered.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        match PLACEHOLDERS.iter().find(|name| after.starts_with(*name)) {
            Some(name) => {
                match *name {
                    "name" => rendered.push_str(&spec.name),
                    "path" => rendered.push_str(&spec.path.to_string_lossy()),
                    "event" => rendered.push_str(event.kind.as_str()),
                    "file" => rendered.push_str(&event.file.to_string_lossy()),
                    _ => rendered.push_str(&event.rfile),
                }
                rest = &after[name.len()..];
            }
            None => {
                rendered.push('$');
                rest = after;
            }
        }
    }

    rendered.push_str(rest);
    rendered
}

/// Split a command line into arguments with POSIX shell quoting rules
pub fn split_command_line(line: &str) -> Result<Vec<String>, CommandError> {
    let args = shlex::split(line).ok_or(CommandError::Unbalanced)?;
    if args.is_empty() {
        return Err(CommandError::Empty);
    }
    Ok(args)
}
