//! Cancellation and termination-signal handling.
//!
//! Signals never run cleanup themselves.  The [`SignalWatcher`] thread
//! receives the signal through `signal-hook`, cancels the shared
//! [`CancelToken`] and wakes the blocked tasks; the server then unwinds on
//! its normal control path and removes the rendezvous socket.  Once that
//! is done, [`resume_default`] lets the signal take its default effect.

use log::{debug, info, warn};
use signal_hook::consts::{SIGABRT, SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Signals intercepted for cleanup.  SIGSEGV, SIGILL and SIGFPE cannot be
/// handled safely and keep their default disposition.
pub const TERMINATION_SIGNALS: [i32; 5] = [SIGINT, SIGTERM, SIGHUP, SIGQUIT, SIGABRT];

/// Shared "stop now" flag for the accept loop and the render loop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call was the one that cancelled.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Background thread that waits for the first termination signal.
pub struct SignalWatcher {
    handle: Handle,
    thread: Option<JoinHandle<Option<i32>>>,
}

impl SignalWatcher {
    /// Register [`TERMINATION_SIGNALS`] and run `on_signal` on the watcher
    /// thread when the first one arrives.
    pub fn install<F>(on_signal: F) -> io::Result<Self>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        Self::install_for(&TERMINATION_SIGNALS, on_signal)
    }

    /// Like [`install`](SignalWatcher::install) for an explicit signal set.
    pub fn install_for<F>(set: &[i32], on_signal: F) -> io::Result<Self>
    where
        F: FnOnce(i32) + Send + 'static,
    {
        let mut signals = Signals::new(set)?;
        let handle = signals.handle();

        let thread = std::thread::Builder::new()
            .name("osd-tac-signals".into())
            .spawn(move || {
                let caught = signals.forever().next();
                if let Some(sig) = caught {
                    info!("caught signal {}, shutting down", sig);
                    on_signal(sig);
                }
                caught
            })?;

        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }

    /// Stop watching and return the signal that was caught, if any.
    pub fn finish(mut self) -> Option<i32> {
        self.stop()
    }

    fn stop(&mut self) -> Option<i32> {
        self.handle.close();
        self.thread.take().and_then(|t| t.join().ok().flatten())
    }
}

impl Drop for SignalWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Apply the default action of `signal` to this process.
///
/// For terminating signals this does not return.  Call it only after
/// cleanup has finished, so the exit status still reports the signal.
pub fn resume_default(signal: i32) -> io::Result<()> {
    debug!("re-raising signal {} with default disposition", signal);
    signal_hook::low_level::emulate_default_handler(signal).map_err(|e| {
        warn!("failed to re-raise signal {}: {}", signal, e);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_hook::consts::SIGUSR1;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn cancel_reports_first_caller_only() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        assert!(token.cancel());
        assert!(!other.cancel());
        assert!(other.is_cancelled());
    }

    // SIGUSR1 is outside TERMINATION_SIGNALS, so raising it cannot reach a
    // server watcher installed by another test.
    #[test]
    fn watcher_reports_caught_signal() {
        let idle = SignalWatcher::install_for(&[SIGUSR1], |_| {}).unwrap();
        assert_eq!(idle.finish(), None);

        let (tx, rx) = mpsc::channel();
        let watcher = SignalWatcher::install_for(&[SIGUSR1], move |sig| {
            let _ = tx.send(sig);
        })
        .unwrap();

        signal_hook::low_level::raise(SIGUSR1).unwrap();
        let got = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(got, SIGUSR1);
        assert_eq!(watcher.finish(), Some(SIGUSR1));
    }
}
