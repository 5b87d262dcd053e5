//! One-shot client: forward a request to the running server and return.

use crate::ipc::codec::{self, ProtocolError};
use crate::request::DisplayRequest;
use log::debug;
use std::io;
use std::os::unix::net::UnixStream;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Nobody accepted the connection.  Not fatal: the invocation still
    /// exits successfully.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: std::path::PathBuf,
        source: io::Error,
    },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ClientError {
    /// `true` when the socket file exists but nothing listens on it.
    pub fn is_refused(&self) -> bool {
        matches!(self, ClientError::Connect { source, .. } if source.kind() == io::ErrorKind::ConnectionRefused)
    }
}

/// Connect to the server at `path` and send `req`.
///
/// The request is encoded before connecting so an invalid request never
/// produces a half-written message on the server side.
pub fn send(path: &Path, req: &DisplayRequest) -> Result<(), ClientError> {
    let buf = codec::encode(req)?;
    let mut stream = UnixStream::connect(path).map_err(|source| ClientError::Connect {
        path: path.to_path_buf(),
        source,
    })?;
    io::Write::write_all(&mut stream, &buf).map_err(ProtocolError::from)?;
    stream
        .shutdown(std::net::Shutdown::Write)
        .map_err(ProtocolError::from)?;
    debug!("sent {:?} to {}", req, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    static TEST_ID: AtomicU32 = AtomicU32::new(0);

    fn tmp_socket_path() -> PathBuf {
        let id = TEST_ID.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "osd-tac-client-test-{}-{}.sock",
            std::process::id(),
            id
        ))
    }

    #[test]
    fn sends_decodable_request() {
        let path = tmp_socket_path();
        let listener = UnixListener::bind(&path).unwrap();
        let req = DisplayRequest {
            progress: 42,
            label: "SYNC".into(),
            ..Default::default()
        };

        let sent = req.clone();
        let p = path.clone();
        let t = std::thread::spawn(move || send(&p, &sent));

        let (stream, _) = listener.accept().unwrap();
        let got = codec::read_request(stream).unwrap();
        assert_eq!(got, req);
        t.join().unwrap().unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_server_is_a_connect_error() {
        let path = tmp_socket_path();
        let err = send(&path, &DisplayRequest::default()).unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
        assert!(!err.is_refused());
    }

    #[test]
    fn dead_socket_is_refused() {
        let path = tmp_socket_path();
        drop(UnixListener::bind(&path).unwrap());
        let err = send(&path, &DisplayRequest::default()).unwrap_err();
        assert!(err.is_refused());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn invalid_request_never_connects() {
        let path = tmp_socket_path();
        let req = DisplayRequest {
            label: String::new(),
            ..Default::default()
        };
        let err = send(&path, &req).unwrap_err();
        assert!(matches!(err, ClientError::Protocol(ProtocolError::EmptyLabel)));
    }
}
