//! `multipart/x-mixed-replace` framing
//!
//! Each frame becomes one part:
//!
//! ```text
//! --FRAME\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: <N>\r\n
//! \r\n
//! <N bytes of JPEG>\r\n
//! ```
//!
//! Browsers replace the displayed image with every new part.

use bytes::{BufMut, Bytes, BytesMut};

use crate::frame::Frame;

/// Multipart boundary token
pub const BOUNDARY: &str = "FRAME";

/// `Content-Type` of the stream response
pub const STREAM_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=FRAME";

/// Encode the boundary line and part headers for a frame of `len` bytes
pub fn encode_part_header(len: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(80);
    buf.put_slice(b"--");
    buf.put_slice(BOUNDARY.as_bytes());
    buf.put_slice(b"\r\nContent-Type: image/jpeg\r\nContent-Length: ");
    buf.put_slice(len.to_string().as_bytes());
    buf.put_slice(b"\r\n\r\n");
    buf
}

/// Encode one complete part for `frame`, trailing CRLF included
pub fn encode_part(frame: &Frame) -> Bytes {
    let mut buf = encode_part_header(frame.len());
    buf.reserve(frame.len() + 2);
    buf.put_slice(frame.data());
    buf.put_slice(b"\r\n");
    buf.freeze()
}
