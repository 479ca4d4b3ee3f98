//! Streaming PROXY protocol decoder.

use std::net::Ipv4Addr;

use bytes::{Bytes, BytesMut};

use crate::cursor::ByteCursor;
use crate::error::ProxyProtocolError;
use crate::haproxy::message::{
    format_ipv6, AddressFamily, ProxiedProtocol, ProxyCommand, ProxyMessage, ProxyVersion,
    UNIX_PATH_LEN,
};
use crate::haproxy::tlv::parse_tlvs;

/// The 12-byte binary signature that opens every v2 header.
const BINARY_PREFIX: &[u8] = b"\r\n\r\n\x00\r\nQUIT\n";

/// The text signature that opens every v1 header.
const TEXT_PREFIX: &[u8] = b"PROXY";

/// Maximum v1 header length, terminator included.
const V1_MAX_LENGTH: usize = 108;

/// Smallest v2 frame that can carry every address family: 16-byte preamble
/// plus the 216-byte AF_UNIX address block.
const V2_MIN_LENGTH: usize = 16 + 216;

/// Largest expressible v2 frame: the length field is 16 bits.
const V2_MAX_LENGTH: usize = 16 + 65535;

/// Upper bound for the configurable TLV budget.
pub const MAX_TLV_SIZE: usize = V2_MAX_LENGTH - V2_MIN_LENGTH;

/// Outcome of sniffing the protocol version from the first bytes of a
/// connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProtocolDetection {
    /// The v1 text signature matched.
    V1,
    /// The v2 binary signature matched.
    V2,
    /// Not enough bytes to rule either signature in or out.
    NeedsMoreData,
    /// Enough bytes arrived and neither signature matched.
    Invalid,
}

/// Incremental decoder for one PROXY protocol header.
///
/// Bind one instance per connection and feed it the accumulation buffer
/// until it emits a [`ProxyMessage`] or fails. The decoder is single-shot:
/// once [`is_finished`](HaproxyDecoder::is_finished) reports true it never
/// touches the buffer again, leaving any remaining bytes for the protocol
/// that follows the header.
///
/// # Example
///
/// ```
/// use bytes::BytesMut;
/// use gangway_proto::haproxy::{HaproxyDecoder, ProxiedProtocol};
///
/// let mut decoder = HaproxyDecoder::new();
/// let mut buf = BytesMut::from(&b"PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\nrest"[..]);
/// let msg = decoder.decode(&mut buf).unwrap().unwrap();
/// assert_eq!(msg.protocol(), ProxiedProtocol::Tcp4);
/// assert!(decoder.is_finished());
/// assert_eq!(&buf[..], b"rest");
/// ```
#[derive(Debug)]
pub struct HaproxyDecoder {
    version: Option<ProxyVersion>,
    finished: bool,
    discarding: bool,
    discarded_bytes: usize,
    /// Bytes left to drop before a discarded v2 frame ends.
    discard_remaining: usize,
    max_header_size: usize,
}

impl Default for HaproxyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl HaproxyDecoder {
    /// Create a decoder that accepts any expressible v2 frame.
    pub fn new() -> HaproxyDecoder {
        HaproxyDecoder {
            version: None,
            finished: false,
            discarding: false,
            discarded_bytes: 0,
            discard_remaining: 0,
            max_header_size: V2_MAX_LENGTH,
        }
    }

    /// Create a decoder with a TLV budget.
    ///
    /// The maximum accepted v2 frame becomes the 232-byte floor plus
    /// `max_tlv_size`, clamped to what the 16-bit length field can express.
    pub fn with_max_tlv_size(max_tlv_size: usize) -> HaproxyDecoder {
        let max_header_size = V2_MIN_LENGTH
            .saturating_add(max_tlv_size.min(MAX_TLV_SIZE))
            .min(V2_MAX_LENGTH);
        HaproxyDecoder {
            max_header_size,
            ..HaproxyDecoder::new()
        }
    }

    /// Whether the decoder has emitted its message (or failed) and should be
    /// removed from the read path.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes dropped so far while resynchronizing after an oversized header.
    pub fn discarded_bytes(&self) -> usize {
        self.discarded_bytes
    }

    /// Sniff which protocol version the buffered bytes announce.
    ///
    /// Twelve bytes are always enough to decide; with fewer, detection stays
    /// inconclusive unless the v1 signature has already matched.
    pub fn detect_protocol(buf: &[u8]) -> ProtocolDetection {
        if buf.len() >= BINARY_PREFIX.len() {
            if &buf[..BINARY_PREFIX.len()] == BINARY_PREFIX {
                return ProtocolDetection::V2;
            }
            if &buf[..TEXT_PREFIX.len()] == TEXT_PREFIX {
                return ProtocolDetection::V1;
            }
            return ProtocolDetection::Invalid;
        }
        if buf.len() >= TEXT_PREFIX.len() && &buf[..TEXT_PREFIX.len()] == TEXT_PREFIX {
            return ProtocolDetection::V1;
        }
        ProtocolDetection::NeedsMoreData
    }

    /// Feed buffered bytes to the decoder.
    ///
    /// Returns `Ok(Some(_))` exactly once per connection. `Ok(None)` means
    /// more bytes are needed (nothing was consumed beyond what the protocol
    /// allows). Errors are fatal: the decoder marks itself finished and the
    /// caller is expected to close the connection.
    pub fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<ProxyMessage>, ProxyProtocolError> {
        if self.finished {
            return Ok(None);
        }
        if self.discarding {
            self.discard(src);
            return Ok(None);
        }
        let version = match self.version {
            Some(version) => version,
            None => match Self::detect_protocol(src) {
                ProtocolDetection::NeedsMoreData => return Ok(None),
                ProtocolDetection::Invalid => {
                    self.finished = true;
                    return Err(ProxyProtocolError::InvalidSignature);
                }
                ProtocolDetection::V1 => {
                    self.version = Some(ProxyVersion::V1);
                    ProxyVersion::V1
                }
                ProtocolDetection::V2 => {
                    self.version = Some(ProxyVersion::V2);
                    ProxyVersion::V2
                }
            },
        };
        match version {
            ProxyVersion::V1 => self.decode_v1(src),
            ProxyVersion::V2 => self.decode_v2(src),
        }
    }

    fn decode_v1(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<ProxyMessage>, ProxyProtocolError> {
        let mut cursor = ByteCursor::new(src);
        let Some(lf) = cursor.find_byte(0, cursor.readable(), |b| b == b'\n') else {
            let readable = cursor.readable();
            if readable > V1_MAX_LENGTH {
                // No terminator within the limit: drop what we have and
                // resynchronize on the next line feed.
                self.discarded_bytes = cursor.skip(readable);
                self.discarding = true;
                return Err(ProxyProtocolError::HeaderTooLong {
                    limit: V1_MAX_LENGTH,
                    discarded: self.discarded_bytes,
                });
            }
            return Ok(None);
        };

        let frame_len = lf + 1;
        if frame_len > V1_MAX_LENGTH {
            cursor.skip(frame_len);
            self.finished = true;
            return Err(ProxyProtocolError::HeaderTooLong {
                limit: V1_MAX_LENGTH,
                discarded: frame_len,
            });
        }
        // The normal parse path is CRLF-strict; a bare LF only terminates
        // lines on the discard-resync path.
        if lf == 0 || cursor.peek(lf - 1) != Some(b'\r') {
            cursor.skip(frame_len);
            self.finished = true;
            return Err(ProxyProtocolError::InvalidEndOfLine);
        }

        let Some(line) = cursor.read_slice(lf - 1) else {
            return Ok(None);
        };
        cursor.skip(2);
        self.finished = true;

        let text = std::str::from_utf8(&line)
            .map_err(|_| ProxyProtocolError::Malformed("v1 header is not ASCII"))?;
        ProxyMessage::from_text(text).map(Some)
    }

    fn decode_v2(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<ProxyMessage>, ProxyProtocolError> {
        let mut cursor = ByteCursor::new(src);
        let Some(address_len) = cursor.peek_u16_be(14) else {
            return Ok(None);
        };
        let total = 16 + address_len as usize;

        if total > self.max_header_size {
            let readable = cursor.readable();
            if readable >= total {
                cursor.skip(total);
                self.finished = true;
                self.discarded_bytes = total;
            } else {
                self.discard_remaining = total - readable;
                self.discarded_bytes = cursor.skip(readable);
                self.discarding = true;
            }
            return Err(ProxyProtocolError::HeaderTooLong {
                limit: self.max_header_size,
                discarded: self.discarded_bytes,
            });
        }

        let Some(frame) = cursor.read_slice(total) else {
            return Ok(None);
        };
        self.finished = true;
        parse_v2_frame(frame).map(Some)
    }

    /// Drop bytes until the oversized frame ends, so a well-formed stream
    /// can resynchronize behind it.
    fn discard(&mut self, src: &mut BytesMut) {
        let mut cursor = ByteCursor::new(src);
        match self.version {
            Some(ProxyVersion::V2) => {
                let skipped = cursor.skip(self.discard_remaining);
                self.discarded_bytes += skipped;
                self.discard_remaining -= skipped;
                if self.discard_remaining == 0 {
                    self.discarding = false;
                    self.finished = true;
                }
            }
            // v1 resyncs on the next line feed, CR or not.
            _ => match cursor.find_byte(0, cursor.readable(), |b| b == b'\n') {
                Some(lf) => {
                    self.discarded_bytes += cursor.skip(lf + 1);
                    self.discarding = false;
                    self.finished = true;
                }
                None => {
                    self.discarded_bytes += cursor.skip(cursor.readable());
                }
            },
        }
    }
}

fn parse_v2_frame(frame: Bytes) -> Result<ProxyMessage, ProxyProtocolError> {
    let ver_cmd = frame[12];
    if ver_cmd & 0xF0 != 0x20 {
        return Err(ProxyProtocolError::InvalidVersion(ver_cmd));
    }
    let command =
        ProxyCommand::from_command_byte(ver_cmd).ok_or(ProxyProtocolError::InvalidCommand(ver_cmd))?;
    if command == ProxyCommand::Local {
        return Ok(ProxyMessage::v2_local().clone());
    }

    let proto_byte = frame[13];
    let protocol = ProxiedProtocol::from_byte(proto_byte)
        .ok_or(ProxyProtocolError::InvalidProtocolByte(proto_byte))?;
    if protocol == ProxiedProtocol::Unknown {
        return Ok(ProxyMessage::v2_unknown().clone());
    }

    let block = frame.slice(16..);
    let family = protocol.address_family();
    let short = |needed: usize| ProxyProtocolError::TruncatedAddressBlock {
        family: family.as_str(),
        got: block.len(),
        needed,
    };

    let (source, dest, source_port, dest_port, consumed) = match family {
        AddressFamily::Inet4 => {
            if block.len() < 12 {
                return Err(short(12));
            }
            let src = Ipv4Addr::new(block[0], block[1], block[2], block[3]).to_string();
            let dst = Ipv4Addr::new(block[4], block[5], block[6], block[7]).to_string();
            let sport = u16::from_be_bytes([block[8], block[9]]);
            let dport = u16::from_be_bytes([block[10], block[11]]);
            (src, dst, sport, dport, 12)
        }
        AddressFamily::Inet6 => {
            if block.len() < 36 {
                return Err(short(36));
            }
            let src = format_ipv6(&block[0..16]);
            let dst = format_ipv6(&block[16..32]);
            let sport = u16::from_be_bytes([block[32], block[33]]);
            let dport = u16::from_be_bytes([block[34], block[35]]);
            (src, dst, sport, dport, 36)
        }
        AddressFamily::Unix => {
            if block.len() < 2 * UNIX_PATH_LEN {
                return Err(short(2 * UNIX_PATH_LEN));
            }
            let src = read_unix_path(&block[..UNIX_PATH_LEN]);
            let dst = read_unix_path(&block[UNIX_PATH_LEN..2 * UNIX_PATH_LEN]);
            // The reader advances over both 108-byte fields exactly; any
            // further bytes in the block are reserved or TLVs.
            (src, dst, 0, 0, 2 * UNIX_PATH_LEN)
        }
        AddressFamily::Unspec => {
            // Unknown is the only UNSPEC protocol and returned above; this
            // arm only keeps the match exhaustive.
            debug_assert!(false, "UNSPEC address family past the Unknown check");
            return Ok(ProxyMessage::v2_unknown().clone());
        }
    };

    let mut tlvs = Vec::new();
    parse_tlvs(block.slice(consumed..), &mut tlvs)?;

    ProxyMessage::new(
        ProxyVersion::V2,
        ProxyCommand::Proxy,
        protocol,
        Some(source),
        Some(dest),
        source_port,
        dest_port,
        tlvs,
    )
}

fn read_unix_path(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
