//! The rendezvous socket: its existence decides who is the server.
//!
//! [`resolve_mode`] binds the socket path exclusively.  The first process
//! to bind becomes the [`Mode::Server`] and owns a [`Rendezvous`]; every
//! later process gets `AddrInUse` and becomes a [`Mode::Client`].  The
//! kernel arbitrates simultaneous starts, so there is no stat-then-bind
//! window.
//!
//! The socket file is removed exactly once, by [`Rendezvous::release`] or
//! on drop.  A server killed without running either leaves the file behind;
//! see [`reclaim_stale`].

use log::{debug, info, warn};
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

/// Errors creating or probing the rendezvous socket.
#[derive(Debug, thiserror::Error)]
pub enum RendezvousError {
    #[error("failed to bind {path}: {source}")]
    Bind { path: PathBuf, source: io::Error },
    #[error("failed to remove stale socket {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// Outcome of [`resolve_mode`].
#[derive(Debug)]
pub enum Mode {
    /// This process bound the socket and must serve.
    Server(Rendezvous),
    /// Another process holds the socket.
    Client,
}

/// Try to become the server for `path`.
pub fn resolve_mode(path: &Path) -> Result<Mode, RendezvousError> {
    match UnixListener::bind(path) {
        Ok(listener) => {
            info!("bound {}, running as server", path.display());
            Ok(Mode::Server(Rendezvous {
                path: path.to_path_buf(),
                listener,
                released: false,
            }))
        }
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            debug!("{} already exists, running as client", path.display());
            Ok(Mode::Client)
        }
        Err(source) => Err(RendezvousError::Bind {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Remove `path` if it is a socket nobody is listening on.
///
/// Returns `true` if the file was removed.  A live server (connect
/// succeeds) or a missing file leaves everything untouched.
pub fn reclaim_stale(path: &Path) -> Result<bool, RendezvousError> {
    match UnixStream::connect(path) {
        Ok(_) => Ok(false),
        Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
            warn!("removing stale socket {}", path.display());
            match std::fs::remove_file(path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(source) => Err(RendezvousError::Remove {
                    path: path.to_path_buf(),
                    source,
                }),
            }
        }
        Err(_) => Ok(false),
    }
}

/// The bound rendezvous socket owned by the server.
#[derive(Debug)]
pub struct Rendezvous {
    path: PathBuf,
    listener: UnixListener,
    released: bool,
}

impl Rendezvous {
    /// The filesystem path of the socket.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn listener(&self) -> &UnixListener {
        &self.listener
    }

    /// Unblock a thread sitting in `accept` on this socket.
    pub fn wake(&self) {
        wake(&self.path);
    }

    /// Remove the socket file.  Safe to call more than once; only the first
    /// call touches the filesystem.
    pub fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("removed {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove {}: {}", self.path.display(), e),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for Rendezvous {
    fn drop(&mut self) {
        self.release();
    }
}

/// Connect to `path` and hang up immediately.  The accept loop treats a
/// connection that arrives after cancellation as a wake-up call.
pub fn wake(path: &Path) {
    if let Err(e) = UnixStream::connect(path) {
        debug!("wake connect to {} failed: {}", path.display(), e);
    }
}
