//! Local IPC between invocations.
//!
//! The first invocation binds the [rendezvous](rendezvous) socket and
//! becomes the server; later invocations [connect](client) and send one
//! binary-[encoded](codec) display request each.

pub mod client;
pub mod codec;
pub mod rendezvous;
