//! RESP encoder.

use bytes::{Bytes, BytesMut};
use smallvec::SmallVec;

use crate::resp::message::{RespMessage, EOL};
use crate::resp::pool::MessagePool;

const NULL_BULK: &[u8] = b"$-1\r\n";
const NULL_ARRAY: &[u8] = b"*-1\r\n";

/// Renders [`RespMessage`] values into wire buffers.
///
/// The primary form, [`encode`](RespEncoder::encode), appends one or more
/// [`Bytes`] to an output list: line-oriented messages become a single
/// buffer, while a bulk string's content is passed through as the refcounted
/// view it already is — header, payload, and CRLF become three entries and
/// the payload is never copied. Integer renderings come from the
/// [`MessagePool`] when cached.
///
/// # Example
///
/// ```
/// use gangway_proto::resp::{RespEncoder, RespMessage};
///
/// let encoder = RespEncoder::new();
/// let mut out = Vec::new();
/// encoder.encode(&RespMessage::Integer(42), &mut out);
/// assert_eq!(&out[0][..], b":42\r\n");
/// ```
#[derive(Debug)]
pub struct RespEncoder {
    pool: &'static MessagePool,
}

impl Default for RespEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RespEncoder {
    /// Create an encoder backed by the shared message pool.
    pub fn new() -> RespEncoder {
        RespEncoder {
            pool: MessagePool::shared(),
        }
    }

    /// Create an encoder backed by a specific pool.
    pub fn with_pool(pool: &'static MessagePool) -> RespEncoder {
        RespEncoder { pool }
    }

    /// Encode one message, appending its wire buffers to `out`.
    pub fn encode(&self, msg: &RespMessage, out: &mut Vec<Bytes>) {
        match msg {
            RespMessage::InlineCommand(content) => out.push(line_buffer(None, content)),
            RespMessage::SimpleString(content) => out.push(line_buffer(Some(b'+'), content)),
            RespMessage::Error(content) => out.push(line_buffer(Some(b'-'), content)),
            RespMessage::Integer(value) => {
                let mut buf = BytesMut::with_capacity(1 + 20 + EOL.len());
                buf.extend_from_slice(b":");
                self.write_decimal(&mut buf, *value);
                buf.extend_from_slice(EOL);
                out.push(buf.freeze());
            }
            RespMessage::BulkStringHeader(length) => {
                out.push(self.length_line(b'$', *length as i64));
            }
            RespMessage::BulkStringContent { data, last } => {
                out.push(data.clone());
                if *last {
                    out.push(Bytes::from_static(EOL));
                }
            }
            RespMessage::FullBulkString(None) => out.push(Bytes::from_static(NULL_BULK)),
            RespMessage::FullBulkString(Some(data)) => {
                out.push(self.length_line(b'$', data.len() as i64));
                out.push(data.clone());
                out.push(Bytes::from_static(EOL));
            }
            RespMessage::ArrayHeader(None) | RespMessage::Array(None) => {
                out.push(Bytes::from_static(NULL_ARRAY));
            }
            RespMessage::ArrayHeader(Some(length)) => {
                out.push(self.length_line(b'*', *length as i64));
            }
            RespMessage::Array(Some(children)) => {
                out.push(self.length_line(b'*', children.len() as i64));
                for child in children {
                    self.encode(child, out);
                }
            }
        }
    }

    /// Encode one message into a single contiguous buffer.
    ///
    /// This is the copying form backing the frame-writer integration; prefer
    /// [`encode`](RespEncoder::encode) where the output can stay scattered.
    pub fn encode_to_buf(&self, msg: &RespMessage, dst: &mut BytesMut) {
        let mut parts = Vec::new();
        self.encode(msg, &mut parts);
        for part in parts {
            dst.extend_from_slice(&part);
        }
    }

    fn length_line(&self, marker: u8, length: i64) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + 20 + EOL.len());
        buf.extend_from_slice(&[marker]);
        self.write_decimal(&mut buf, length);
        buf.extend_from_slice(EOL);
        buf.freeze()
    }

    fn write_decimal(&self, dst: &mut BytesMut, value: i64) {
        if let Some(cached) = self.pool.integer_bytes(value) {
            dst.extend_from_slice(&cached);
        } else {
            dst.extend_from_slice(&int_to_ascii(value));
        }
    }
}

/// One line-oriented message as a single buffer: optional marker, content,
/// CRLF, sized exactly.
fn line_buffer(marker: Option<u8>, content: &Bytes) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + content.len() + EOL.len());
    if let Some(marker) = marker {
        buf.extend_from_slice(&[marker]);
    }
    buf.extend_from_slice(content);
    buf.extend_from_slice(EOL);
    buf.freeze()
}

/// Render a signed decimal without going through `fmt`.
fn int_to_ascii(value: i64) -> SmallVec<[u8; 20]> {
    let mut buf = SmallVec::new();
    let mut magnitude = value.unsigned_abs();
    loop {
        buf.push(b'0' + (magnitude % 10) as u8);
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        buf.push(b'-');
    }
    buf.reverse();
    buf
}
