//! Instance coordination: decide whether this invocation serves or
//! forwards, then do it.

use crate::config::Layout;
use crate::ipc::client::{self, ClientError};
use crate::ipc::codec::ProtocolError;
use crate::ipc::rendezvous::{self, resolve_mode, Mode, Rendezvous, RendezvousError};
use crate::request::DisplayRequest;
use crate::server::{Server, ServerError};
use crate::shutdown::{CancelToken, SignalWatcher, TERMINATION_SIGNALS};
use crate::traits::Surface;
use log::{info, warn};
use std::path::PathBuf;

/// Fatal errors.  Anything that reaches `main` ends the process with a
/// non-zero status.
#[derive(Debug, thiserror::Error)]
pub enum OsdError {
    #[error(transparent)]
    Rendezvous(#[from] RendezvousError),
    #[error("invalid request: {0}")]
    Request(#[from] ProtocolError),
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),
    #[error("failed to create rendering surface: {0}")]
    Surface(String),
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Everything one invocation needs, already merged from config and flags.
#[derive(Debug, Clone)]
pub struct Options {
    pub socket_path: PathBuf,
    pub request: DisplayRequest,
    pub layout: Layout,
    pub reclaim_stale: bool,
}

/// What this invocation ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ran as the server.  `signal` is the termination signal that ended
    /// it, if any; the caller should re-raise it after returning.
    Served { signal: Option<i32> },
    /// Handed the request to the running server.
    Forwarded,
    /// The socket exists but nobody accepted the request.
    NoServer,
}

/// Resolve the mode for `opts.socket_path` and run it to completion.
///
/// `make_surface` is only called when this process becomes the server,
/// so clients never touch the display.
pub fn run<S, E, F>(opts: &Options, make_surface: F) -> Result<Outcome, OsdError>
where
    S: Surface,
    E: std::fmt::Display,
    F: FnOnce() -> Result<S, E>,
{
    run_with_signals(opts, &TERMINATION_SIGNALS, make_surface)
}

/// Like [`run`], but the server shuts down on the signals in `signals`.
pub fn run_with_signals<S, E, F>(
    opts: &Options,
    signals: &[i32],
    make_surface: F,
) -> Result<Outcome, OsdError>
where
    S: Surface,
    E: std::fmt::Display,
    F: FnOnce() -> Result<S, E>,
{
    let bound = match claim_or_forward(opts)? {
        Ok(bound) => bound,
        Err(outcome) => return Ok(outcome),
    };

    let mut surface = make_surface().map_err(|e| OsdError::Surface(e.to_string()))?;
    serve(bound, opts, signals, &mut surface)
}

/// Either bind the socket (`Ok(Ok(_))`) or forward the request to whoever
/// holds it (`Ok(Err(outcome))`).
fn claim_or_forward(opts: &Options) -> Result<Result<Rendezvous, Outcome>, OsdError> {
    let mut reclaimed = false;
    loop {
        match resolve_mode(&opts.socket_path)? {
            Mode::Server(bound) => return Ok(Ok(bound)),
            Mode::Client => match client::send(&opts.socket_path, &opts.request) {
                Ok(()) => return Ok(Err(Outcome::Forwarded)),
                Err(e) if e.is_refused() && opts.reclaim_stale && !reclaimed => {
                    reclaimed = true;
                    rendezvous::reclaim_stale(&opts.socket_path)?;
                }
                Err(ClientError::Protocol(e)) => return Err(OsdError::Request(e)),
                Err(e @ ClientError::Connect { .. }) => {
                    warn!("{}; nothing will be displayed", e);
                    return Ok(Err(Outcome::NoServer));
                }
            },
        }
    }
}

fn serve<S: Surface>(
    bound: Rendezvous,
    opts: &Options,
    signals: &[i32],
    surface: &mut S,
) -> Result<Outcome, OsdError> {
    let cancel = CancelToken::new();
    let hide = surface.hide_signal();

    let watcher = {
        let cancel = cancel.clone();
        let hide = hide.clone();
        let path = bound.path().to_path_buf();
        SignalWatcher::install_for(signals, move |_| {
            cancel.cancel();
            hide.raise();
            rendezvous::wake(&path);
        })
        .map_err(OsdError::Signals)?
    };

    let server = Server::new(bound, opts.request.clone(), hide, opts.layout, cancel);
    let result = server.run(surface);
    let signal = watcher.finish();
    result?;

    info!("exiting");
    Ok(Outcome::Served { signal })
}
