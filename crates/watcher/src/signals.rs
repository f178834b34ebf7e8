//! Signal bridge
//!
//! Signals never touch watcher state. Each one is turned into a `Control`
//! message and queued on the loop like any other event.

use crate::event_loop::{Control, ControlHandle};
use std::io;
use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tracing::debug;

/// Control request carried by a signal
pub fn control_for(kind: SignalKind) -> Option<Control> {
    if kind == SignalKind::hangup() {
        Some(Control::Reload)
    } else if kind == SignalKind::user_defined1() {
        Some(Control::StartAll)
    } else if kind == SignalKind::user_defined2() {
        Some(Control::StopAll)
    } else if kind == SignalKind::interrupt() || kind == SignalKind::terminate() {
        Some(Control::Shutdown)
    } else {
        None
    }
}

/// Install the handlers and forward signals until the loop goes away
///
/// SIGHUP reloads, SIGUSR1 starts, SIGUSR2 stops, SIGINT and SIGTERM shut
/// down.
pub fn spawn_signal_bridge(control: ControlHandle) -> io::Result<JoinHandle<()>> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut usr2 = signal(SignalKind::user_defined2())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let kind = tokio::select! {
                Some(()) = hangup.recv() => SignalKind::hangup(),
                Some(()) = usr1.recv() => SignalKind::user_defined1(),
                Some(()) = usr2.recv() => SignalKind::user_defined2(),
                Some(()) = interrupt.recv() => SignalKind::interrupt(),
                Some(()) = terminate.recv() => SignalKind::terminate(),
                else => break,
            };

            let Some(request) = control_for(kind) else {
                continue;
            };
            debug!(?request, "signal received");

            if !control.send(request) {
                break;
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::{channel, LoopEvent};
    use nix::sys::signal::{raise, Signal};
    use std::time::Duration;

    #[test]
    fn test_signal_mapping() {
        assert_eq!(control_for(SignalKind::hangup()), Some(Control::Reload));
        assert_eq!(control_for(SignalKind::user_defined1()), Some(Control::StartAll));
        assert_eq!(control_for(SignalKind::user_defined2()), Some(Control::StopAll));
        assert_eq!(control_for(SignalKind::terminate()), Some(Control::Shutdown));
        assert_eq!(control_for(SignalKind::interrupt()), Some(Control::Shutdown));
        assert_eq!(control_for(SignalKind::alarm()), None);
    }

    #[tokio::test]
    async fn test_signal_becomes_loop_event() {
        let (tx, mut rx) = channel();
        let bridge = spawn_signal_bridge(ControlHandle::new(tx)).unwrap();

        raise(Signal::SIGUSR2).unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, LoopEvent::Control(Control::StopAll)));

        bridge.abort();
    }
}
