//! Binary codec for [`DisplayRequest`]s.
//!
//! # Wire format
//!
//! A fixed 24-byte header (all integers little-endian) followed by three
//! NUL-terminated strings back to back:
//!
//! ```text
//!  0        4        8   9      12         16        20         24
//! +--------+--------+---+------+----------+---------+----------+-----------------+
//! |progress|timeout |pct| rsvd |label_len |font_len |color_len | label\0 font\0  |
//! |  i32   |  i32   |u8 | [u8;3]|   u32   |  u32    |   u32    | color\0         |
//! +--------+--------+---+------+----------+---------+----------+-----------------+
//! ```
//!
//! Every length includes its terminator, so a reader can fetch the header,
//! compute the exact body size, and read exactly that many bytes without
//! scanning for terminators.

use crate::request::DisplayRequest;
use std::io::{self, Read, Write};

/// Size of the fixed header in bytes.
pub const HEADER_LEN: usize = 24;

/// Upper bound on the body size accepted by [`read_request`].
pub const MAX_BODY_LEN: usize = 64 * 1024;

/// Errors produced while encoding or decoding a request.
///
/// Everything except [`Io`](ProtocolError::Io) and the `Invalid*` encode
/// errors counts as a malformed message: the connection that carried it
/// is dropped and the server keeps running.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed message: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("malformed message: body of {0} bytes exceeds limit")]
    BodyTooLarge(usize),
    #[error("malformed message: {0} is not NUL-terminated")]
    MissingTerminator(&'static str),
    #[error("malformed message: {0} contains an interior NUL")]
    InteriorNul(&'static str),
    #[error("malformed message: {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
    #[error("invalid request: label is empty")]
    EmptyLabel,
    #[error("invalid request: {0} contains a NUL byte")]
    InvalidField(&'static str),
}

impl ProtocolError {
    /// `true` for errors caused by the bytes a peer sent, as opposed to a
    /// local I/O failure or an invalid request on the sending side.
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            ProtocolError::Io(_) | ProtocolError::EmptyLabel | ProtocolError::InvalidField(_)
        )
    }
}

/// The decoded fixed-size header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub progress: i32,
    pub timeout_secs: i32,
    pub show_progress_line: bool,
    pub label_len: u32,
    pub font_len: u32,
    pub color_len: u32,
}

impl Header {
    /// Parse the fixed header.  Never fails: every bit pattern is a header,
    /// validation happens once the body lengths are known.
    pub fn decode(buf: &[u8; HEADER_LEN]) -> Self {
        let u32_at = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        Self {
            progress: u32_at(0) as i32,
            timeout_secs: u32_at(4) as i32,
            show_progress_line: buf[8] != 0,
            label_len: u32_at(12),
            font_len: u32_at(16),
            color_len: u32_at(20),
        }
    }

    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.progress.to_le_bytes());
        buf[4..8].copy_from_slice(&self.timeout_secs.to_le_bytes());
        buf[8] = u8::from(self.show_progress_line);
        buf[12..16].copy_from_slice(&self.label_len.to_le_bytes());
        buf[16..20].copy_from_slice(&self.font_len.to_le_bytes());
        buf[20..24].copy_from_slice(&self.color_len.to_le_bytes());
        buf
    }

    /// Number of body bytes that must follow this header, or `None` if
    /// the sum does not fit in `usize`.
    pub fn body_len(&self) -> Option<usize> {
        [self.label_len, self.font_len, self.color_len]
            .into_iter()
            .try_fold(0usize, |acc, n| acc.checked_add(usize::try_from(n).ok()?))
    }
}

/// Encode `req` into a single buffer (header + body).
pub fn encode(req: &DisplayRequest) -> Result<Vec<u8>, ProtocolError> {
    if req.label.is_empty() {
        return Err(ProtocolError::EmptyLabel);
    }
    for (name, value) in fields(req) {
        if value.as_bytes().contains(&0) {
            return Err(ProtocolError::InvalidField(name));
        }
    }

    let header = Header {
        progress: req.progress,
        timeout_secs: req.timeout_secs,
        show_progress_line: req.show_progress_line,
        label_len: wire_len(&req.label),
        font_len: wire_len(&req.font),
        color_len: wire_len(&req.color),
    };

    let mut buf = Vec::with_capacity(HEADER_LEN + header.body_len().unwrap_or(0));
    buf.extend_from_slice(&header.encode());
    for (_, value) in fields(req) {
        buf.extend_from_slice(value.as_bytes());
        buf.push(0);
    }
    Ok(buf)
}

/// Decode the body that follows `header`.
///
/// `body` must hold exactly [`Header::body_len`] bytes.
pub fn decode_body(header: &Header, body: &[u8]) -> Result<DisplayRequest, ProtocolError> {
    let expected = header.body_len().ok_or(ProtocolError::BodyTooLarge(usize::MAX))?;
    if body.len() != expected {
        return Err(ProtocolError::Truncated {
            expected,
            got: body.len(),
        });
    }

    let (label, rest) = body.split_at(header.label_len as usize);
    let (font, color) = rest.split_at(header.font_len as usize);

    Ok(DisplayRequest {
        progress: header.progress,
        timeout_secs: header.timeout_secs,
        show_progress_line: header.show_progress_line,
        label: c_string("label", label)?,
        font: c_string("font", font)?,
        color: c_string("color", color)?,
    })
}

/// Read exactly one request from `reader`: the header first, then exactly
/// the number of body bytes it declares.
pub fn read_request<R: Read>(mut reader: R) -> Result<DisplayRequest, ProtocolError> {
    let mut head = [0u8; HEADER_LEN];
    read_full(&mut reader, &mut head)?;
    let header = Header::decode(&head);

    let len = header.body_len().unwrap_or(usize::MAX);
    if len > MAX_BODY_LEN {
        return Err(ProtocolError::BodyTooLarge(len));
    }
    let mut body = vec![0u8; len];
    read_full(&mut reader, &mut body)?;
    decode_body(&header, &body)
}

/// Encode `req` and write it to `writer` in one call.
pub fn write_request<W: Write>(mut writer: W, req: &DisplayRequest) -> Result<(), ProtocolError> {
    let buf = encode(req)?;
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

//  Helpers

fn fields(req: &DisplayRequest) -> [(&'static str, &str); 3] {
    [
        ("label", req.label.as_str()),
        ("font", req.font.as_str()),
        ("color", req.color.as_str()),
    ]
}

fn wire_len(s: &str) -> u32 {
    (s.len() + 1) as u32
}

/// Like `read_exact`, but reports a short read as [`ProtocolError::Truncated`]
/// with the number of bytes actually received.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError> {
    let mut got = 0;
    while got < buf.len() {
        match reader.read(&mut buf[got..]) {
            Ok(0) => {
                return Err(ProtocolError::Truncated {
                    expected: buf.len(),
                    got,
                })
            }
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn c_string(field: &'static str, bytes: &[u8]) -> Result<String, ProtocolError> {
    let (last, text) = bytes
        .split_last()
        .ok_or(ProtocolError::MissingTerminator(field))?;
    if *last != 0 {
        return Err(ProtocolError::MissingTerminator(field));
    }
    if text.contains(&0) {
        return Err(ProtocolError::InteriorNul(field));
    }
    String::from_utf8(text.to_vec()).map_err(|_| ProtocolError::InvalidUtf8(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> DisplayRequest {
        DisplayRequest {
            progress: 55,
            timeout_secs: 3,
            show_progress_line: true,
            label: "BUILD".into(),
            font: "bold 18px monospace".into(),
            color: "LawnGreen".into(),
        }
    }

    #[test]
    fn round_trip_preserves_all_fields() {
        let req = sample();
        let bytes = encode(&req).unwrap();
        let decoded = read_request(Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn write_request_emits_exactly_one_message() {
        let mut buf = Vec::new();
        write_request(&mut buf, &sample()).unwrap();
        assert_eq!(buf, encode(&sample()).unwrap());

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_request(&mut cursor).unwrap(), sample());
        assert_eq!(cursor.position() as usize, cursor.get_ref().len());
    }

    #[test]
    fn round_trip_passes_out_of_range_values_through() {
        let req = DisplayRequest {
            progress: -7,
            timeout_secs: 0,
            label: "ünïcödé ✓".into(),
            ..sample()
        };
        let decoded = read_request(Cursor::new(encode(&req).unwrap())).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn header_lengths_include_terminators() {
        let bytes = encode(&sample()).unwrap();
        let head: [u8; HEADER_LEN] = bytes[..HEADER_LEN].try_into().unwrap();
        let header = Header::decode(&head);
        assert_eq!(header.label_len, 6);
        assert_eq!(header.color_len, 10);
        assert_eq!(bytes.len(), HEADER_LEN + header.body_len().unwrap());
        assert_eq!(&bytes[HEADER_LEN..HEADER_LEN + 6], b"BUILD\0");
    }

    #[test]
    fn reserved_bytes_are_zero() {
        let bytes = encode(&sample()).unwrap();
        assert_eq!(&bytes[9..12], &[0, 0, 0]);
    }

    #[test]
    fn truncated_body_is_malformed() {
        let mut bytes = encode(&sample()).unwrap();
        bytes.truncate(bytes.len() - 4);
        let err = read_request(Cursor::new(bytes)).unwrap_err();
        assert!(err.is_malformed());
        assert!(matches!(err, ProtocolError::Truncated { .. }));
    }

    #[test]
    fn truncated_header_is_malformed() {
        let err = read_request(Cursor::new(vec![1, 2, 3])).unwrap_err();
        match err {
            ProtocolError::Truncated { expected, got } => {
                assert_eq!(expected, HEADER_LEN);
                assert_eq!(got, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_terminator_is_rejected() {
        let mut bytes = encode(&sample()).unwrap();
        // Overwrite the label terminator.
        bytes[HEADER_LEN + 5] = b'!';
        let err = read_request(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingTerminator("label")));
    }

    #[test]
    fn zero_length_field_is_rejected() {
        let header = Header {
            progress: 0,
            timeout_secs: 1,
            show_progress_line: false,
            label_len: 0,
            font_len: 1,
            color_len: 1,
        };
        let err = decode_body(&header, &[0, 0]).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingTerminator("label")));
    }

    #[test]
    fn oversized_body_is_rejected_before_reading() {
        let header = Header {
            progress: 0,
            timeout_secs: 1,
            show_progress_line: false,
            label_len: u32::MAX,
            font_len: 1,
            color_len: 1,
        };
        let err = read_request(Cursor::new(header.encode().to_vec())).unwrap_err();
        assert!(matches!(err, ProtocolError::BodyTooLarge(_)));
    }

    #[test]
    fn maximal_lengths_do_not_overflow() {
        let header = Header {
            progress: 0,
            timeout_secs: 1,
            show_progress_line: false,
            label_len: u32::MAX,
            font_len: u32::MAX,
            color_len: u32::MAX,
        };
        if let Some(len) = header.body_len() {
            assert_eq!(len as u64, 3 * u64::from(u32::MAX));
        }
        let err = read_request(Cursor::new(header.encode().to_vec())).unwrap_err();
        assert!(matches!(err, ProtocolError::BodyTooLarge(_)));
        let err = decode_body(&header, &[0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::BodyTooLarge(_) | ProtocolError::Truncated { .. }
        ));
    }

    #[test]
    fn encode_rejects_empty_label_and_nul() {
        let empty = DisplayRequest {
            label: String::new(),
            ..sample()
        };
        assert!(matches!(encode(&empty), Err(ProtocolError::EmptyLabel)));

        let nul = DisplayRequest {
            font: "mono\0space".into(),
            ..sample()
        };
        let err = encode(&nul).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidField("font")));
        assert!(!err.is_malformed());
    }

    #[test]
    fn nonzero_flag_byte_decodes_as_true() {
        let mut bytes = encode(&DisplayRequest {
            show_progress_line: false,
            ..sample()
        })
        .unwrap();
        bytes[8] = 7;
        assert!(read_request(Cursor::new(bytes)).unwrap().show_progress_line);
    }
}
