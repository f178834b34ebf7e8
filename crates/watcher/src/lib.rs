//! File system watching for fmon
//!
//! This crate provides the watch-subscription manager:
//! - Recursive watch trees with depth limits, kept in step with created and
//!   deleted directories
//! - Mount table reconciliation with synthesized mount events
//! - Event classification and the filter pipeline
//! - Command and print actions
//! - A single-threaded event loop fed by notifications, mount polling and
//!   signals

pub mod dispatch;
pub mod error;
pub mod event;
pub mod event_loop;
pub mod filter;
pub mod mount;
pub mod platform;
pub mod reconcile;
pub mod signals;
pub mod subscription;
pub mod tree;

#[cfg(test)]
mod testing;

pub use dispatch::{Dispatcher, Spawner, TokioSpawner};
pub use error::WatchError;
pub use event::Event;
pub use event_loop::{
    channel, App, BackendFactory, Control, ControlHandle, Flow, LoopEvent, LoopReceiver, LoopSender, SpecLoader, WatcherId,
};
pub use mount::{MountEntry, MountSnapshot, MountTable, SystemMountTable};
pub use platform::{NotifyBackend, NotifyBackendFactory};
pub use reconcile::{MountMonitor, MountReconciler};
pub use signals::spawn_signal_bridge;
pub use subscription::{Subscription, SubscriptionRegistry, WatchBackend};
pub use tree::Watcher;
