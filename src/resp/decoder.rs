//! Streaming RESP decoder.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::RespCodecError;
use crate::resp::message::{
    RespMessage, RespMessageType, DEFAULT_MAX_INLINE_LENGTH, MAX_DECIMAL_DIGITS, MAX_VALUE_LENGTH,
};
use crate::resp::pool::MessagePool;

/// Decoder states. The type marker decides whether a frame is a single line
/// or length-prefixed; bulk strings add two more states for their streamed
/// content and the trailing CRLF of the zero-length form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    DecodeType,
    DecodeInline(RespMessageType),
    DecodeLength(RespMessageType),
    DecodeBulkEol,
    DecodeBulkContent,
}

/// Incremental decoder from bytes to framing-level [`RespMessage`] values.
///
/// Call [`decode`](RespDecoder::decode) in a loop: each call yields at most
/// one message, and `Ok(None)` means the buffer holds no complete frame yet.
/// Bulk strings longer than the buffered input are streamed out as
/// [`RespMessage::BulkStringHeader`] followed by
/// [`RespMessage::BulkStringContent`] chunks; feed them through a
/// [`BulkStringAggregator`](crate::resp::BulkStringAggregator) to coalesce.
///
/// Errors reset the decoder to the type state before surfacing, so a
/// transport that chooses to keep the connection alive can resume at the
/// next frame boundary.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use gangway_proto::resp::{RespDecoder, RespMessage};
///
/// let mut decoder = RespDecoder::new();
/// let mut buf = BytesMut::from(&b"+OK\r\n:42\r\n"[..]);
/// assert_eq!(decoder.decode(&mut buf).unwrap(), Some(RespMessage::simple("OK")));
/// assert_eq!(decoder.decode(&mut buf).unwrap(), Some(RespMessage::Integer(42)));
/// assert_eq!(decoder.decode(&mut buf).unwrap(), None);
/// ```
#[derive(Debug)]
pub struct RespDecoder {
    state: DecoderState,
    inline_commands: bool,
    max_inline_length: usize,
    pool: &'static MessagePool,
    /// Bulk-string bytes still expected while in the content state.
    remaining: usize,
}

impl Default for RespDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RespDecoder {
    /// Create a decoder with inline commands disabled, the default 64 KiB
    /// inline cap, and the shared message pool.
    pub fn new() -> RespDecoder {
        RespDecoder {
            state: DecoderState::DecodeType,
            inline_commands: false,
            max_inline_length: DEFAULT_MAX_INLINE_LENGTH,
            pool: MessagePool::shared(),
            remaining: 0,
        }
    }

    /// Enable or disable inline commands. When disabled, a frame that does
    /// not start with a type marker is an error.
    pub fn inline_commands(mut self, enabled: bool) -> RespDecoder {
        self.inline_commands = enabled;
        self
    }

    /// Set the maximum length of a single inline message.
    pub fn max_inline_length(mut self, max: usize) -> RespDecoder {
        self.max_inline_length = max;
        self
    }

    /// Use a specific message pool instead of the shared one.
    pub fn with_pool(mut self, pool: &'static MessagePool) -> RespDecoder {
        self.pool = pool;
        self
    }

    /// Drop any partial frame state and return to the type state.
    pub fn reset(&mut self) {
        self.state = DecoderState::DecodeType;
        self.remaining = 0;
    }

    /// Decode at most one message from the buffered bytes.
    pub fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<RespMessage>, RespCodecError> {
        let result = self.decode_inner(src);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn decode_inner(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<RespMessage>, RespCodecError> {
        loop {
            match self.state {
                DecoderState::DecodeType => {
                    let Some(&marker) = src.first() else {
                        return Ok(None);
                    };
                    let ty = match RespMessageType::from_marker(marker) {
                        Some(ty) => {
                            src.advance(1);
                            ty
                        }
                        None if self.inline_commands => RespMessageType::InlineCommand,
                        None => return Err(RespCodecError::UnknownType(marker)),
                    };
                    self.state = if ty.is_inline() {
                        DecoderState::DecodeInline(ty)
                    } else {
                        DecoderState::DecodeLength(ty)
                    };
                }
                DecoderState::DecodeInline(ty) => {
                    let Some(line) = read_line(src)? else {
                        if src.len() > self.max_inline_length {
                            return Err(RespCodecError::InlineTooLong {
                                limit: self.max_inline_length,
                            });
                        }
                        return Ok(None);
                    };
                    self.state = DecoderState::DecodeType;
                    return Ok(Some(self.inline_message(ty, line)?));
                }
                DecoderState::DecodeLength(ty) => {
                    let Some(line) = read_line(src)? else {
                        return Ok(None);
                    };
                    let length = parse_decimal(&line)?;
                    if length < -1 {
                        return Err(RespCodecError::InvalidLength(length));
                    }
                    match ty {
                        RespMessageType::ArrayHeader => {
                            self.state = DecoderState::DecodeType;
                            let header = if length < 0 {
                                RespMessage::ArrayHeader(None)
                            } else {
                                RespMessage::ArrayHeader(Some(length as u64))
                            };
                            return Ok(Some(header));
                        }
                        _ => {
                            if length > MAX_VALUE_LENGTH as i64 {
                                return Err(RespCodecError::InvalidLength(length));
                            }
                            match length {
                                -1 => {
                                    self.state = DecoderState::DecodeType;
                                    return Ok(Some(RespMessage::FullBulkString(None)));
                                }
                                0 => self.state = DecoderState::DecodeBulkEol,
                                _ => {
                                    self.remaining = length as usize;
                                    self.state = DecoderState::DecodeBulkContent;
                                    return Ok(Some(RespMessage::BulkStringHeader(
                                        length as usize,
                                    )));
                                }
                            }
                        }
                    }
                }
                DecoderState::DecodeBulkEol => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    read_end_of_line(src)?;
                    self.state = DecoderState::DecodeType;
                    return Ok(Some(RespMessage::FullBulkString(Some(Bytes::new()))));
                }
                DecoderState::DecodeBulkContent => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    // Tail chunk: the rest of the content plus its CRLF is here.
                    if src.len() >= self.remaining + 2 {
                        let data = src.split_to(self.remaining).freeze();
                        read_end_of_line(src)?;
                        self.remaining = 0;
                        self.state = DecoderState::DecodeType;
                        return Ok(Some(RespMessage::BulkStringContent { data, last: true }));
                    }
                    if self.remaining == 0 {
                        // Only the CRLF is outstanding.
                        return Ok(None);
                    }
                    let take = self.remaining.min(src.len());
                    let data = src.split_to(take).freeze();
                    self.remaining -= take;
                    return Ok(Some(RespMessage::BulkStringContent { data, last: false }));
                }
            }
        }
    }

    fn inline_message(
        &self,
        ty: RespMessageType,
        line: Bytes,
    ) -> Result<RespMessage, RespCodecError> {
        Ok(match ty {
            RespMessageType::SimpleString => match self.pool.simple_string(&line) {
                Some(pooled) => pooled,
                None => RespMessage::SimpleString(line),
            },
            RespMessageType::Error => match self.pool.error(&line) {
                Some(pooled) => pooled,
                None => RespMessage::Error(line),
            },
            RespMessageType::Integer => {
                let value = parse_decimal(&line)?;
                match self.pool.integer(value) {
                    Some(pooled) => pooled,
                    None => RespMessage::Integer(value),
                }
            }
            _ => RespMessage::InlineCommand(line),
        })
    }
}

/// Detach one CRLF-terminated line, or `None` if no line feed is buffered
/// yet. The line feed must be preceded by a carriage return.
fn read_line(src: &mut BytesMut) -> Result<Option<Bytes>, RespCodecError> {
    let Some(lf) = src.iter().position(|&b| b == b'\n') else {
        return Ok(None);
    };
    if lf == 0 || src[lf - 1] != b'\r' {
        return Err(RespCodecError::DelimiterMismatch);
    }
    let line = src.split_to(lf - 1).freeze();
    src.advance(2);
    Ok(Some(line))
}

/// Consume a CRLF pair. The caller has already checked two bytes exist.
fn read_end_of_line(src: &mut BytesMut) -> Result<(), RespCodecError> {
    if &src[..2] != b"\r\n" {
        return Err(RespCodecError::DelimiterMismatch);
    }
    src.advance(2);
    Ok(())
}

/// Parse a signed ASCII decimal.
///
/// The magnitude is accumulated with wrapping arithmetic and the sign
/// applied afterwards, which reproduces the wire behavior for the full
/// 19-digit range including `i64::MIN`.
fn parse_decimal(line: &[u8]) -> Result<i64, RespCodecError> {
    let (negative, digits) = match line.split_first() {
        Some((&b'-', rest)) => (true, rest),
        _ => (false, line),
    };
    if digits.is_empty() {
        return Err(RespCodecError::NonDigit {
            byte: *line.first().unwrap_or(&b'-'),
        });
    }
    if digits.len() > MAX_DECIMAL_DIGITS {
        return Err(RespCodecError::IntegerTooLong {
            limit: MAX_DECIMAL_DIGITS,
        });
    }
    let mut value: i64 = 0;
    for &byte in digits {
        if !byte.is_ascii_digit() {
            return Err(RespCodecError::NonDigit { byte });
        }
        value = value.wrapping_mul(10).wrapping_add(i64::from(byte - b'0'));
    }
    Ok(if negative { value.wrapping_neg() } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut RespDecoder, buf: &mut BytesMut) -> Vec<RespMessage> {
        let mut out = Vec::new();
        while let Some(msg) = decoder.decode(buf).unwrap() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_decode_simple_string() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"+OK\r\n"[..]);
        assert_eq!(
            decoder.decode(&mut buf).unwrap(),
            Some(RespMessage::simple("OK"))
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_error_and_integer() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"-ERR no such key\r\n:-1\r\n:1234\r\n"[..]);
        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(
            messages,
            vec![
                RespMessage::error("ERR no such key"),
                RespMessage::Integer(-1),
                RespMessage::Integer(1234),
            ]
        );
    }

    #[test]
    fn test_decode_bulk_string_whole() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"$6\r\nfoobar\r\n"[..]);
        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(
            messages,
            vec![
                RespMessage::BulkStringHeader(6),
                RespMessage::BulkStringContent {
                    data: Bytes::from_static(b"foobar"),
                    last: true,
                },
            ]
        );
    }

    #[test]
    fn test_decode_bulk_string_chunked() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"$6\r\nfoo"[..]);
        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(
            messages,
            vec![
                RespMessage::BulkStringHeader(6),
                RespMessage::BulkStringContent {
                    data: Bytes::from_static(b"foo"),
                    last: false,
                },
            ]
        );

        buf.extend_from_slice(b"bar\r\n");
        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(
            messages,
            vec![RespMessage::BulkStringContent {
                data: Bytes::from_static(b"bar"),
                last: true,
            }]
        );
    }

    #[test]
    fn test_decode_null_and_empty_bulk() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"$-1\r\n$0\r\n\r\n"[..]);
        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(
            messages,
            vec![
                RespMessage::FullBulkString(None),
                RespMessage::FullBulkString(Some(Bytes::new())),
            ]
        );
    }

    #[test]
    fn test_decode_array_headers() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"*3\r\n*0\r\n*-1\r\n"[..]);
        let messages = decode_all(&mut decoder, &mut buf);
        assert_eq!(
            messages,
            vec![
                RespMessage::ArrayHeader(Some(3)),
                RespMessage::ArrayHeader(Some(0)),
                RespMessage::ArrayHeader(None),
            ]
        );
    }

    #[test]
    fn test_unknown_type_without_inline() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"PING\r\n"[..]);
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(RespCodecError::UnknownType(b'P'))
        ));
        // The error reset the decoder.
        let mut buf = BytesMut::from(&b"+OK\r\n"[..]);
        assert!(decoder.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn test_inline_command_enabled() {
        let mut decoder = RespDecoder::new().inline_commands(true);
        let mut buf = BytesMut::from(&b"PING\r\n"[..]);
        assert_eq!(
            decoder.decode(&mut buf).unwrap(),
            Some(RespMessage::inline("PING"))
        );
    }

    #[test]
    fn test_inline_length_cap() {
        let mut decoder = RespDecoder::new().inline_commands(true).max_inline_length(8);
        let mut buf = BytesMut::from(&b"way past the limit"[..]);
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(RespCodecError::InlineTooLong { limit: 8 })
        ));
    }

    #[test]
    fn test_lf_requires_cr() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"+OK\n"[..]);
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(RespCodecError::DelimiterMismatch)
        ));
    }

    #[test]
    fn test_bulk_content_delimiter_enforced() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"$3\r\nabcXY"[..]);
        assert_eq!(
            decoder.decode(&mut buf).unwrap(),
            Some(RespMessage::BulkStringHeader(3))
        );
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(RespCodecError::DelimiterMismatch)
        ));
    }

    #[test]
    fn test_bulk_length_cap() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"$536870913\r\n"[..]);
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(RespCodecError::InvalidLength(536870913))
        ));
    }

    #[test]
    fn test_negative_length_below_null() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"$-2\r\n"[..]);
        assert!(matches!(
            decoder.decode(&mut buf),
            Err(RespCodecError::InvalidLength(-2))
        ));
    }

    #[test]
    fn test_parse_decimal_edges() {
        assert_eq!(parse_decimal(b"0").unwrap(), 0);
        assert_eq!(parse_decimal(b"-1").unwrap(), -1);
        assert_eq!(
            parse_decimal(b"9223372036854775807").unwrap(),
            i64::MAX
        );
        assert_eq!(
            parse_decimal(b"-9223372036854775808").unwrap(),
            i64::MIN
        );
        assert!(matches!(
            parse_decimal(b"12a4"),
            Err(RespCodecError::NonDigit { byte: b'a' })
        ));
        assert!(matches!(
            parse_decimal(b""),
            Err(RespCodecError::NonDigit { .. })
        ));
        assert!(matches!(
            parse_decimal(b"-"),
            Err(RespCodecError::NonDigit { .. })
        ));
        assert!(matches!(
            parse_decimal(b"12345678901234567890"),
            Err(RespCodecError::IntegerTooLong { .. })
        ));
    }

    #[test]
    fn test_pooled_messages_share_storage() {
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"+OK\r\n"[..]);
        let decoded = decoder.decode(&mut buf).unwrap().unwrap();
        let pooled = MessagePool::shared().simple_string(b"OK").unwrap();
        let (RespMessage::SimpleString(a), RespMessage::SimpleString(b)) = (decoded, pooled)
        else {
            panic!("expected simple strings");
        };
        assert_eq!(a.as_ptr(), b.as_ptr());
    }

    #[test]
    fn test_split_eol_across_reads() {
        // The CRLF straddles two reads: the content streams out as a
        // non-last chunk, and the empty last chunk follows once the line
        // feed arrives.
        let mut decoder = RespDecoder::new();
        let mut buf = BytesMut::from(&b"$6\r\nfoobar\r"[..]);
        let mut messages = decode_all(&mut decoder, &mut buf);
        buf.extend_from_slice(b"\n");
        messages.extend(decode_all(&mut decoder, &mut buf));
        assert_eq!(
            messages,
            vec![
                RespMessage::BulkStringHeader(6),
                RespMessage::BulkStringContent {
                    data: Bytes::from_static(b"foobar"),
                    last: false,
                },
                RespMessage::BulkStringContent {
                    data: Bytes::new(),
                    last: true,
                },
            ]
        );
    }
}
