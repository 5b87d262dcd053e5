//! Rendering surfaces and the cross-thread [`HideSignal`].
//!
//! * [`console::ConsoleSurface`] writes frames as text and is always
//!   available.
//! * [`gtk::GtkSurface`] (feature `surface-gtk`) draws a GTK4
//!   layer-shell overlay on the calling thread.

pub mod console;
#[cfg(feature = "surface-gtk")]
pub mod gtk;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Which [`Surface`](crate::traits::Surface) the server renders on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    #[default]
    Gtk,
    Console,
}

type Waker = Box<dyn Fn() + Send + Sync>;

/// A latch that asks the current surface to hide as soon as possible.
///
/// Raised by the accept loop when a newer request arrives and by the
/// signal watcher on termination.  Surfaces either block on
/// [`wait`](HideSignal::wait) or poll [`take`](HideSignal::take) from their
/// own event loop after registering a [waker](HideSignal::set_waker).
#[derive(Clone, Default)]
pub struct HideSignal {
    inner: Arc<HideInner>,
}

#[derive(Default)]
struct HideInner {
    raised: Mutex<bool>,
    cond: Condvar,
    waker: Mutex<Option<Waker>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl HideSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a hide and wake whoever is waiting.
    pub fn raise(&self) {
        *lock(&self.inner.raised) = true;
        self.inner.cond.notify_all();
        if let Some(wake) = lock(&self.inner.waker).as_ref() {
            wake();
        }
    }

    /// Drop a pending hide request without consuming it.
    pub fn clear(&self) {
        *lock(&self.inner.raised) = false;
    }

    /// Consume a pending hide request.  Returns `true` if one was raised.
    pub fn take(&self) -> bool {
        std::mem::take(&mut *lock(&self.inner.raised))
    }

    pub fn is_raised(&self) -> bool {
        *lock(&self.inner.raised)
    }

    /// Block until the signal is raised or `timeout` elapses (`None` waits
    /// forever).  Returns `true` if the signal was raised, consuming it.
    pub fn wait(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut raised = lock(&self.inner.raised);
        while !*raised {
            match deadline {
                None => {
                    raised = self
                        .inner
                        .cond
                        .wait(raised)
                        .unwrap_or_else(|p| p.into_inner());
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    raised = self
                        .inner
                        .cond
                        .wait_timeout(raised, deadline - now)
                        .unwrap_or_else(|p| p.into_inner())
                        .0;
                }
            }
        }
        *raised = false;
        true
    }

    /// Install a callback run on every [`raise`](HideSignal::raise), for
    /// surfaces that sleep in their own event loop instead of in
    /// [`wait`](HideSignal::wait).
    pub fn set_waker(&self, wake: impl Fn() + Send + Sync + 'static) {
        *lock(&self.inner.waker) = Some(Box::new(wake));
    }
}

impl fmt::Debug for HideSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HideSignal")
            .field("raised", &self.is_raised())
            .finish()
    }
}
