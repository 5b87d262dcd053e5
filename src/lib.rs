//! **osd-tac**: a single-instance on-screen progress notifier.
//!
//! The first invocation on a host binds a Unix socket and becomes the
//! *server*: it renders its own request and keeps accepting newer ones
//! until the display times out with nothing left to show.  Every later
//! invocation is a one-shot *client* that forwards its request over the
//! socket and exits, so the on-screen OSD updates in place instead of
//! stacking windows.
//!
//! # Architecture
//!
//! * [`coordinator`] resolves server vs. client mode via
//!   [`ipc::rendezvous`] and runs whichever applies.
//! * [`ipc::codec`] is the binary wire format; [`ipc::client`] sends it.
//! * [`server`] holds the shared [`ServerState`](server::ServerState) and
//!   the accept loop; [`render`] is the render loop.
//! * [`traits::Surface`] abstracts the rendering surface so the core is
//!   not tied to GTK; implementations live in [`surface`].
//! * [`shutdown`] turns termination signals into cancellation and then
//!   restores their default effect.

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod ipc;
pub mod render;
pub mod request;
pub mod server;
pub mod shutdown;
pub mod surface;
pub mod traits;
