//! The server side: shared state and the accept loop.
//!
//! A [`Server`] owns the bound [`Rendezvous`] and runs two tasks:
//!
//! * the **accept loop** on a scoped background thread, which decodes one
//!   request per connection and installs it into [`ServerState`];
//! * the **render loop** on the calling thread (GTK requires the thread
//!   that initialised it), see [`render`](crate::render).
//!
//! The two share only [`ServerState`].  Its lock is held for a field
//! read or write, never across a render wait or a socket call.

use crate::config::Layout;
use crate::ipc::codec;
use crate::ipc::rendezvous::Rendezvous;
use crate::render::run_render_loop;
use crate::request::DisplayRequest;
use crate::shutdown::CancelToken;
use crate::surface::HideSignal;
use crate::traits::Surface;
use log::{debug, error, info, warn};
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::{Mutex, MutexGuard};

/// Possible errors from a server run.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
    #[error("rendering surface error: {0}")]
    Surface(String),
}

//  Shared state

#[derive(Debug)]
struct Slot {
    current: DisplayRequest,
    pending_update: bool,
    finished: bool,
}

/// State shared by the accept loop and the render loop.
///
/// Installing a request and raising the hide signal happen under the same
/// lock as the render loop's idle-check, so a hide is never left over from
/// a request the render loop has already picked up.
#[derive(Debug)]
pub struct ServerState {
    slot: Mutex<Slot>,
    hide: HideSignal,
}

impl ServerState {
    /// State for a server whose own invocation asked for `initial`.
    pub fn new(initial: DisplayRequest, hide: HideSignal) -> Self {
        Self {
            slot: Mutex::new(Slot {
                current: initial,
                pending_update: false,
                finished: false,
            }),
            hide,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("server state lock poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn current(&self) -> DisplayRequest {
        self.lock().current.clone()
    }

    /// The request the render loop should draw first.  Anything installed
    /// before this call is folded into it, so it is not rendered twice.
    pub fn take_current(&self) -> DisplayRequest {
        let mut slot = self.lock();
        slot.pending_update = false;
        self.hide.clear();
        slot.current.clone()
    }

    pub fn pending_update(&self) -> bool {
        self.lock().pending_update
    }

    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    /// Make `req` the current request and hide whatever is on screen.
    ///
    /// Returns `false` if the render loop has already finished; the request
    /// is dropped because nothing will render it.
    pub fn install(&self, req: DisplayRequest) -> bool {
        let mut slot = self.lock();
        if slot.finished {
            return false;
        }
        slot.current = req;
        slot.pending_update = true;
        self.hide.raise();
        true
    }

    /// Consume a pending update.  Returns the request to render next, or
    /// `None` after marking the state finished.
    pub fn idle_check(&self) -> Option<DisplayRequest> {
        let mut slot = self.lock();
        if slot.pending_update {
            slot.pending_update = false;
            self.hide.clear();
            Some(slot.current.clone())
        } else {
            slot.finished = true;
            None
        }
    }

    /// Mark finished regardless of pending work.
    pub fn finish(&self) {
        let mut slot = self.lock();
        slot.pending_update = false;
        slot.finished = true;
    }
}

//  Server

/// The single running instance.
pub struct Server {
    rendezvous: Rendezvous,
    state: ServerState,
    layout: Layout,
    cancel: CancelToken,
}

impl Server {
    pub fn new(
        rendezvous: Rendezvous,
        initial: DisplayRequest,
        hide: HideSignal,
        layout: Layout,
        cancel: CancelToken,
    ) -> Self {
        Self {
            rendezvous,
            state: ServerState::new(initial, hide),
            layout,
            cancel,
        }
    }

    /// Serve until the render loop runs out of work or the cancel token
    /// fires, then remove the rendezvous socket.
    ///
    /// `surface` must be the surface whose [`HideSignal`] was passed to
    /// [`Server::new`].
    pub fn run<S: Surface>(mut self, surface: &mut S) -> Result<(), ServerError> {
        let result = std::thread::scope(|scope| {
            let accept = std::thread::Builder::new()
                .name("osd-tac-accept".into())
                .spawn_scoped(scope, || self.accept_loop())
                .map_err(ServerError::Accept)?;

            let rendered = run_render_loop(surface, &self.state, &self.layout, &self.cancel);

            // Stop accepting: the loop checks the token after every accept.
            self.cancel.cancel();
            self.rendezvous.wake();
            let accepted = accept.join().unwrap_or_else(|_| {
                error!("accept thread panicked");
                Ok(())
            });

            match rendered {
                Ok(n) => debug!("rendered {} frame(s)", n),
                Err(e) => return Err(ServerError::Surface(e.to_string())),
            }
            accepted
        });

        self.rendezvous.release();
        result
    }

    fn accept_loop(&self) -> Result<(), ServerError> {
        let listener: &UnixListener = self.rendezvous.listener();
        info!("listening on {}", self.rendezvous.path().display());

        loop {
            let accepted = listener.accept();
            if self.cancel.is_cancelled() {
                debug!("accept loop stopping");
                return Ok(());
            }
            match accepted {
                Ok((stream, _)) => self.handle_connection(stream),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("accept error: {}", e);
                    // Unblock the render loop so the server can shut down.
                    self.cancel.cancel();
                    self.state.hide.raise();
                    return Err(ServerError::Accept(e));
                }
            }
        }
    }

    fn handle_connection(&self, stream: UnixStream) {
        debug!("client connected");
        match codec::read_request(&stream) {
            Ok(req) => {
                debug!("received {:?}", req);
                if !self.state.install(req) {
                    warn!("render loop already finished; request dropped");
                }
            }
            Err(e) if e.is_malformed() => warn!("dropping connection: {}", e),
            Err(e) => error!("read error: {}", e),
        }
    }
}
