//! Mount reconciliation
//!
//! A filesystem mounted over (or unmounted from) a watched directory
//! silently invalidates the subscriptions below it. The reconciler diffs
//! mount table snapshots, rebuilds the affected part of every watch tree
//! and synthesizes `mounted`/`unmounted` events for the filter.

use crate::event::Event;
use crate::event_loop::{LoopEvent, LoopSender};
use crate::mount::{MountSnapshot, MountTable};
use crate::tree::{depth_below, Watcher};
use fmon_core::EventKind;
use std::path::Path;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Keeps watch trees consistent with the mount table
#[derive(Debug, Default)]
pub struct MountReconciler {
    snapshot: MountSnapshot,
}

impl MountReconciler {
    pub fn new(snapshot: MountSnapshot) -> Self {
        Self { snapshot }
    }

    /// Last reconciled snapshot
    pub fn snapshot(&self) -> &MountSnapshot {
        &self.snapshot
    }

    /// Apply a fresh snapshot to `watchers`
    ///
    /// Returns the synthesized events with the index of their watcher, in
    /// order: unmounts first, then mounts.
    pub fn reconcile(&mut self, fresh: MountSnapshot, watchers: &mut [Watcher]) -> Vec<(usize, Event)> {
        let diff = self.snapshot.diff(&fresh);
        let mut events = Vec::new();

        for entry in &diff.removed {
            self.apply(EventKind::Unmounted, &entry.path, watchers, &mut events);
        }
        for entry in &diff.added {
            self.apply(EventKind::Mounted, &entry.path, watchers, &mut events);
        }

        self.snapshot = fresh;
        events
    }

    fn apply(&self, kind: EventKind, mount: &Path, watchers: &mut [Watcher], events: &mut Vec<(usize, Event)>) {
        if mount.parent().is_none() {
            return;
        }

        for (index, watcher) in watchers.iter_mut().enumerate() {
            if !watcher.is_running() || !is_relevant(watcher, mount) {
                continue;
            }

            rebuild(watcher, kind, mount);
            events.push((index, Event::new(watcher.spec(), kind, mount.to_path_buf())));
        }
    }
}

/// Whether a mount change at `mount` touches the watcher
fn is_relevant(watcher: &Watcher, mount: &Path) -> bool {
    if mount.starts_with(watcher.root()) {
        return true;
    }
    watcher.spec().recursive && watcher.registry().covers(mount)
}

fn rebuild(watcher: &mut Watcher, kind: EventKind, mount: &Path) {
    let at_root = mount == watcher.root();

    if !watcher.spec().recursive {
        if !at_root {
            return;
        }

        let root = watcher.root().to_path_buf();
        watcher.remove_path(&root);
        if kind == EventKind::Mounted {
            if let Err(e) = watcher.install_subtree(&root, 0) {
                error!(watcher = %watcher.name(), "{}", e);
            }
        }
        return;
    }

    let removed = watcher.remove_subtree(mount);
    if at_root {
        watcher.remove_path(mount);
    }
    debug!(watcher = %watcher.name(), path = %mount.display(), removed, "watch subtree removed");

    match kind {
        EventKind::Mounted => {
            info!(watcher = %watcher.name(), path = %mount.display(), "path mounted");
            let depth = depth_below(watcher.root(), mount).unwrap_or(0);
            if !watcher.spec().within_depth(depth) {
                debug!(watcher = %watcher.name(), path = %mount.display(), "maximum depth of recursion reached");
                return;
            }
            if let Err(e) = watcher.install_subtree(mount, depth) {
                error!(watcher = %watcher.name(), "{}", e);
            }
        }
        _ => info!(watcher = %watcher.name(), path = %mount.display(), "path unmounted"),
    }
}

/// Polls the mount table and notifies the loop when it changes
pub struct MountMonitor {
    table: Box<dyn MountTable>,
    interval: Duration,
    last: MountSnapshot,
    tx: LoopSender,
}

impl MountMonitor {
    pub fn new(table: Box<dyn MountTable>, interval: Duration, tx: LoopSender) -> Self {
        let last = table.snapshot().unwrap_or_default();
        Self {
            table,
            interval,
            last,
            tx,
        }
    }

    /// Poll until the loop goes away
    pub async fn run(mut self) {
        // a zero period would make `interval` panic
        let mut timer = interval(self.interval.max(Duration::from_millis(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("Starting mount table polling (interval: {:?})", self.interval);

        loop {
            timer.tick().await;

            let current = match self.table.snapshot() {
                Ok(current) => current,
                Err(e) => {
                    warn!("Unable to read mount table: {}", e);
                    continue;
                }
            };

            if current == self.last {
                continue;
            }

            self.last = current;
            if self.tx.send(LoopEvent::MountsChanged).is_err() {
                break;
            }
        }
    }
}
