//! The single control loop
//!
//! `App` owns every watcher, the mount reconciler and the dispatcher.
//! Notifications, mount changes and control requests all arrive as
//! `LoopEvent`s on one channel and are handled to completion one at a time,
//! so no state is ever shared across threads.

use crate::dispatch::Dispatcher;
use crate::error::WatchError;
use crate::event::{classify, Event};
use crate::filter::accepts;
use crate::mount::MountTable;
use crate::reconcile::MountReconciler;
use crate::subscription::WatchBackend;
use crate::tree::{depth_below, Watcher};
use fmon_core::{ConfigError, EventKind, WatcherSpec};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub type LoopSender = mpsc::UnboundedSender<LoopEvent>;
pub type LoopReceiver = mpsc::UnboundedReceiver<LoopEvent>;

/// Create the loop channel
pub fn channel() -> (LoopSender, LoopReceiver) {
    mpsc::unbounded_channel()
}

/// Identifies the watcher a notification belongs to
///
/// The generation changes on every reload so that notifications still in
/// flight for the previous watcher set are recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatcherId {
    pub generation: u64,
    pub index: usize,
}

/// Control requests, usually translated from signals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Re-read the configuration and rebuild every watcher
    Reload,
    /// Start all watchers and list their subscriptions
    StartAll,
    /// Stop all watchers
    StopAll,
    /// Stop all watchers and leave the loop
    Shutdown,
}

#[derive(Debug)]
pub enum LoopEvent {
    /// Raw notification from a watcher backend
    Fs {
        id: WatcherId,
        result: notify::Result<notify::Event>,
    },
    /// The mount table differs from the last poll
    MountsChanged,
    Control(Control),
}

/// Whether the loop keeps going after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Creates the subscription backend of each watcher
pub trait BackendFactory {
    fn create(&mut self, id: WatcherId) -> Result<Box<dyn WatchBackend>, WatchError>;
}

/// Produces a fresh watcher set on reload
pub trait SpecLoader {
    fn load(&mut self) -> Result<Vec<WatcherSpec>, ConfigError>;
}

impl<F> SpecLoader for F
where
    F: FnMut() -> Result<Vec<WatcherSpec>, ConfigError>,
{
    fn load(&mut self) -> Result<Vec<WatcherSpec>, ConfigError> {
        self()
    }
}

/// Cloneable entry point for control requests
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: LoopSender,
}

impl ControlHandle {
    pub fn new(tx: LoopSender) -> Self {
        Self { tx }
    }

    /// Schedule `control` on the loop, false when the loop is gone
    pub fn send(&self, control: Control) -> bool {
        self.tx.send(LoopEvent::Control(control)).is_ok()
    }

    pub fn reload(&self) -> bool {
        self.send(Control::Reload)
    }

    pub fn start_all(&self) -> bool {
        self.send(Control::StartAll)
    }

    pub fn stop_all(&self) -> bool {
        self.send(Control::StopAll)
    }

    pub fn shutdown(&self) -> bool {
        self.send(Control::Shutdown)
    }
}

/// Application context owning all watcher state
pub struct App {
    watchers: Vec<Watcher>,
    generation: u64,
    factory: Box<dyn BackendFactory>,
    loader: Option<Box<dyn SpecLoader>>,
    mounts: Box<dyn MountTable>,
    reconciler: MountReconciler,
    dispatcher: Dispatcher,
}

impl App {
    /// Build one watcher per spec
    ///
    /// Watchers are created stopped; call `start` to install their trees.
    pub fn new(
        specs: Vec<WatcherSpec>,
        mut factory: Box<dyn BackendFactory>,
        mounts: Box<dyn MountTable>,
        dispatcher: Dispatcher,
    ) -> Result<Self, WatchError> {
        let generation = 0;
        let watchers = build_watchers(specs, generation, factory.as_mut())?;

        let snapshot = mounts.snapshot().unwrap_or_else(|e| {
            warn!("Unable to read mount table: {}", e);
            Default::default()
        });

        Ok(Self {
            watchers,
            generation,
            factory,
            loader: None,
            mounts,
            reconciler: MountReconciler::new(snapshot),
            dispatcher,
        })
    }

    /// Source of the watcher set used on reload
    pub fn with_loader(mut self, loader: impl SpecLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn watchers(&self) -> &[Watcher] {
        &self.watchers
    }

    /// Start every stopped watcher
    ///
    /// A watcher whose root cannot be subscribed is logged and left stopped.
    pub fn start(&mut self) {
        for watcher in &mut self.watchers {
            if let Err(e) = watcher.start() {
                error!(watcher = %watcher.name(), "unable to start watcher: {}", e);
            }
        }
    }

    /// Stop every watcher
    pub fn stop(&mut self) {
        for watcher in &mut self.watchers {
            watcher.stop();
        }
    }

    /// Sorted subscriptions of the named watcher
    pub fn list_active_paths(&self, name: &str) -> Option<Vec<PathBuf>> {
        self.watchers
            .iter()
            .find(|w| w.name() == name)
            .map(|w| w.active_paths())
    }

    /// Log the subscriptions of every watcher
    pub fn list_monitors(&self) {
        info!("listing monitors");
        for watcher in &self.watchers {
            for path in watcher.active_paths() {
                info!(watcher = %watcher.name(), path = %path.display(), "monitor");
            }
        }
        info!("end of list");
    }

    /// Replace the watcher set with a freshly loaded one
    ///
    /// On any failure the running set is left untouched.
    pub fn reload(&mut self) -> Result<(), WatchError> {
        let Some(loader) = self.loader.as_mut() else {
            warn!("no configuration source, reload ignored");
            return Ok(());
        };

        let specs = loader.load()?;
        let generation = self.generation + 1;
        let fresh = build_watchers(specs, generation, self.factory.as_mut())?;

        self.stop();
        self.watchers = fresh;
        self.generation = generation;
        self.start();

        info!(watchers = self.watchers.len(), "configuration reloaded");
        Ok(())
    }

    /// Handle one loop event to completion
    pub fn handle(&mut self, event: LoopEvent) -> Flow {
        match event {
            LoopEvent::Fs { id, result } => {
                if id.generation != self.generation {
                    debug!(?id, "notification from a previous configuration dropped");
                    return Flow::Continue;
                }
                match result {
                    Ok(raw) => {
                        for path in &raw.paths {
                            if let Some(kind) = classify(&raw.kind, path) {
                                self.handle_change(id.index, kind, path);
                            }
                        }
                    }
                    Err(e) => error!("file monitor error: {}", e),
                }
            }
            LoopEvent::MountsChanged => self.handle_mounts(),
            LoopEvent::Control(control) => return self.handle_control(control),
        }
        Flow::Continue
    }

    fn handle_control(&mut self, control: Control) -> Flow {
        match control {
            Control::Reload => {
                info!("reloading configuration");
                if let Err(e) = self.reload() {
                    error!("{}, keeping current configuration", e);
                }
            }
            Control::StartAll => {
                self.start();
                self.list_monitors();
            }
            Control::StopAll => self.stop(),
            Control::Shutdown => {
                self.stop();
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    fn handle_change(&mut self, index: usize, kind: EventKind, path: &Path) {
        let Some(watcher) = self.watchers.get_mut(index) else {
            return;
        };
        if !watcher.is_running() {
            return;
        }

        if !update_tree(watcher, kind, path) {
            return;
        }

        let event = Event::new(watcher.spec(), kind, path.to_path_buf());
        if accepts(watcher.spec(), &event) {
            self.dispatcher.dispatch(watcher.spec(), &event);
        }
    }

    fn handle_mounts(&mut self) {
        let fresh = match self.mounts.snapshot() {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("Unable to read mount table: {}", e);
                return;
            }
        };

        for (index, event) in self.reconciler.reconcile(fresh, &mut self.watchers) {
            let spec = self.watchers[index].spec();
            if accepts(spec, &event) {
                self.dispatcher.dispatch(spec, &event);
            }
        }
    }

    /// Process events until shutdown or until every sender is gone
    pub async fn run(mut self, mut rx: LoopReceiver) {
        while let Some(event) = rx.recv().await {
            if self.handle(event) == Flow::Exit {
                info!("shutting down");
                return;
            }
        }
        self.stop();
    }
}

/// Keep the watch tree in step with created and deleted directories
/// Keep the watch tree in step with the change. Returns false when the
/// change repeats one already dispatched.
fn update_tree(watcher: &mut Watcher, kind: EventKind, path: &Path) -> bool {
    if !watcher.spec().recursive || path == watcher.root() {
        return true;
    }

    match kind {
        EventKind::Deleted => return watcher.directory_deleted(path),
        EventKind::Created => {
            let is_dir = path.symlink_metadata().map(|m| m.is_dir()).unwrap_or(false);
            if !is_dir {
                return true;
            }

            let Some(depth) = depth_below(watcher.root(), path) else {
                return true;
            };
            if !watcher.spec().within_depth(depth) {
                debug!(watcher = %watcher.name(), path = %path.display(), "maximum depth of recursion reached");
                return true;
            }

            match watcher.install_subtree(path, depth) {
                Ok(count) => info!(watcher = %watcher.name(), path = %path.display(), monitors = count, "watcher updated"),
                Err(e) => error!(watcher = %watcher.name(), "{}", e),
            }
        }
        _ => {}
    }
    true
}

fn build_watchers(
    specs: Vec<WatcherSpec>,
    generation: u64,
    factory: &mut dyn BackendFactory,
) -> Result<Vec<Watcher>, WatchError> {
    specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| {
            let backend = factory.create(WatcherId { generation, index })?;
            Ok(Watcher::new(spec, backend))
        })
        .collect()
}
