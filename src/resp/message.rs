//! RESP message types.

use bytes::Bytes;

/// Hard cap on a single RESP value: 512 MiB, fixed by the protocol.
pub const MAX_VALUE_LENGTH: usize = 512 * 1024 * 1024;

/// Default cap on an inline message (one line without bulk framing).
pub const DEFAULT_MAX_INLINE_LENGTH: usize = 64 * 1024;

/// Longest decimal magnitude an `i64` can carry.
pub(crate) const MAX_DECIMAL_DIGITS: usize = 19;

pub(crate) const EOL: &[u8] = b"\r\n";

/// RESP frame types and their wire markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RespMessageType {
    /// A bare command line without framing; only ever sent client → server.
    InlineCommand,
    /// `+`: one line of non-binary text.
    SimpleString,
    /// `-`: one line of error text.
    Error,
    /// `:`: a signed 64-bit decimal integer.
    Integer,
    /// `$`: a length-prefixed binary blob.
    BulkString,
    /// `*`: a length-prefixed sequence of messages.
    ArrayHeader,
}

impl RespMessageType {
    /// Map a wire marker byte to its type. Inline commands have no marker.
    pub fn from_marker(byte: u8) -> Option<RespMessageType> {
        match byte {
            b'+' => Some(RespMessageType::SimpleString),
            b'-' => Some(RespMessageType::Error),
            b':' => Some(RespMessageType::Integer),
            b'$' => Some(RespMessageType::BulkString),
            b'*' => Some(RespMessageType::ArrayHeader),
            _ => None,
        }
    }

    /// The wire marker for this type, if it has one.
    pub fn marker(self) -> Option<u8> {
        match self {
            RespMessageType::InlineCommand => None,
            RespMessageType::SimpleString => Some(b'+'),
            RespMessageType::Error => Some(b'-'),
            RespMessageType::Integer => Some(b':'),
            RespMessageType::BulkString => Some(b'$'),
            RespMessageType::ArrayHeader => Some(b'*'),
        }
    }

    /// Whether this type is a single line terminated by CRLF.
    pub fn is_inline(self) -> bool {
        matches!(
            self,
            RespMessageType::InlineCommand
                | RespMessageType::SimpleString
                | RespMessageType::Error
                | RespMessageType::Integer
        )
    }
}

/// One RESP message.
///
/// The framing-level variants (`BulkStringHeader`, `BulkStringContent`,
/// `ArrayHeader`) appear on the wire boundary between the decoder and the
/// aggregators; application code normally sees the aggregated forms
/// (`FullBulkString`, `Array`) plus the line types.
///
/// Content is carried as [`Bytes`]: decoded payloads are refcounted views
/// into the input buffer, and pooled messages share static storage.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RespMessage {
    /// A bare command line, e.g. `PING`.
    InlineCommand(Bytes),
    /// `+OK`-style one-line string.
    SimpleString(Bytes),
    /// `-ERR ...`-style one-line error.
    Error(Bytes),
    /// `:42`-style integer.
    Integer(i64),
    /// Announces a bulk string of the given length; chunks follow.
    BulkStringHeader(usize),
    /// One streamed chunk of a bulk string.
    BulkStringContent {
        /// The chunk payload.
        data: Bytes,
        /// Whether this chunk completes the bulk string.
        last: bool,
    },
    /// A complete bulk string; `None` is the RESP null bulk (`$-1`).
    FullBulkString(Option<Bytes>),
    /// Announces an array of the given length; `None` is the null array (`*-1`).
    ArrayHeader(Option<u64>),
    /// A complete array; `None` is null, `Some(vec![])` is empty.
    Array(Option<Vec<RespMessage>>),
}

impl RespMessage {
    /// A simple string from static or owned content.
    pub fn simple(content: impl Into<Bytes>) -> RespMessage {
        RespMessage::SimpleString(content.into())
    }

    /// An error from static or owned content.
    pub fn error(content: impl Into<Bytes>) -> RespMessage {
        RespMessage::Error(content.into())
    }

    /// An inline command from static or owned content.
    pub fn inline(content: impl Into<Bytes>) -> RespMessage {
        RespMessage::InlineCommand(content.into())
    }

    /// A complete bulk string.
    pub fn bulk(content: impl Into<Bytes>) -> RespMessage {
        RespMessage::FullBulkString(Some(content.into()))
    }

    /// The null bulk string (`$-1`).
    pub fn null_bulk() -> RespMessage {
        RespMessage::FullBulkString(None)
    }

    /// A complete array of children.
    pub fn array(children: Vec<RespMessage>) -> RespMessage {
        RespMessage::Array(Some(children))
    }

    /// The empty array (`*0`).
    pub fn empty_array() -> RespMessage {
        RespMessage::Array(Some(Vec::new()))
    }

    /// The null array (`*-1`).
    pub fn null_array() -> RespMessage {
        RespMessage::Array(None)
    }

    /// The line content of a textual message, if this is one.
    pub fn text(&self) -> Option<&Bytes> {
        match self {
            RespMessage::InlineCommand(content)
            | RespMessage::SimpleString(content)
            | RespMessage::Error(content) => Some(content),
            _ => None,
        }
    }
}
