//! Type-Length-Value records carried by PROXY v2 headers.

use bytes::{Buf, Bytes};

use crate::error::ProxyProtocolError;

/// Well-known TLV type tags.
///
/// Anything outside the known set decodes as [`Other`](TlvKind::Other); the
/// raw type byte is preserved on the record either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TlvKind {
    /// `PP2_TYPE_ALPN` (0x01): negotiated application protocol.
    Alpn,
    /// `PP2_TYPE_AUTHORITY` (0x02): SNI host name.
    Authority,
    /// `PP2_TYPE_SSL` (0x20): TLS termination info, wraps nested TLVs.
    Ssl,
    /// `PP2_SUBTYPE_SSL_VERSION` (0x21).
    SslVersion,
    /// `PP2_SUBTYPE_SSL_CN` (0x22): client certificate common name.
    SslCn,
    /// `PP2_TYPE_NETNS` (0x30): network namespace.
    Netns,
    /// Any unregistered or unrecognized type byte.
    Other,
}

impl TlvKind {
    /// Map a wire type byte to its kind.
    pub fn from_byte(byte: u8) -> TlvKind {
        match byte {
            0x01 => TlvKind::Alpn,
            0x02 => TlvKind::Authority,
            0x20 => TlvKind::Ssl,
            0x21 => TlvKind::SslVersion,
            0x22 => TlvKind::SslCn,
            0x30 => TlvKind::Netns,
            _ => TlvKind::Other,
        }
    }
}

/// One TLV record from a v2 header.
///
/// The SSL type carries structured fields and encapsulated child records, so
/// it gets its own variant; everything else is a plain tag + value.
#[derive(Debug, Clone, PartialEq)]
pub enum Tlv {
    /// A plain TLV record.
    Regular {
        /// Decoded type tag.
        kind: TlvKind,
        /// Raw wire type byte (meaningful when `kind` is `Other`).
        type_byte: u8,
        /// The value bytes, shared with the input buffer.
        value: Bytes,
    },
    /// A `PP2_TYPE_SSL` record with its decoded front matter and children.
    Ssl(SslTlv),
}

impl Tlv {
    /// Decoded type tag of this record.
    pub fn kind(&self) -> TlvKind {
        match self {
            Tlv::Regular { kind, .. } => *kind,
            Tlv::Ssl(_) => TlvKind::Ssl,
        }
    }

    /// Raw wire type byte of this record.
    pub fn type_byte(&self) -> u8 {
        match self {
            Tlv::Regular { type_byte, .. } => *type_byte,
            Tlv::Ssl(_) => 0x20,
        }
    }

    /// The full value bytes of this record (for SSL, including the client
    /// bitfield and verify field in front of the nested records).
    pub fn value(&self) -> &Bytes {
        match self {
            Tlv::Regular { value, .. } => value,
            Tlv::Ssl(ssl) => &ssl.value,
        }
    }
}

/// Decoded `PP2_TYPE_SSL` TLV.
#[derive(Debug, Clone, PartialEq)]
pub struct SslTlv {
    client: u8,
    verify: i32,
    value: Bytes,
    encapsulated: Vec<Tlv>,
}

impl SslTlv {
    /// Client connected over SSL/TLS.
    pub const CLIENT_SSL: u8 = 0x01;
    /// Client presented a certificate on this connection.
    pub const CLIENT_CERT_CONN: u8 = 0x02;
    /// Client presented a certificate at least once in this TLS session.
    pub const CLIENT_CERT_SESS: u8 = 0x04;

    /// Raw client bitfield.
    pub fn client(&self) -> u8 {
        self.client
    }

    /// Whether the client connected over SSL/TLS.
    pub fn client_ssl(&self) -> bool {
        self.client & Self::CLIENT_SSL != 0
    }

    /// Whether the client presented a certificate on this connection.
    pub fn client_cert_conn(&self) -> bool {
        self.client & Self::CLIENT_CERT_CONN != 0
    }

    /// Whether the client presented a certificate during this TLS session.
    pub fn client_cert_sess(&self) -> bool {
        self.client & Self::CLIENT_CERT_SESS != 0
    }

    /// Certificate verification result; zero means verified.
    pub fn verify(&self) -> i32 {
        self.verify
    }

    /// Nested records in wire order.
    pub fn encapsulated(&self) -> &[Tlv] {
        &self.encapsulated
    }
}

/// Parse a TLV section into `out`.
///
/// Records shorter than a type byte plus a length field at the tail of the
/// section are ignored, matching deployed decoders. An SSL record is pushed
/// followed by its encapsulated children, flattened in order.
pub(crate) fn parse_tlvs(mut section: Bytes, out: &mut Vec<Tlv>) -> Result<(), ProxyProtocolError> {
    while section.len() >= 4 {
        let type_byte = section[0];
        let len = u16::from_be_bytes([section[1], section[2]]) as usize;
        if section.len() < 3 + len {
            return Err(ProxyProtocolError::TruncatedTlv);
        }
        let value = section.slice(3..3 + len);
        section.advance(3 + len);
        push_tlv(type_byte, value, out)?;
    }
    Ok(())
}

fn push_tlv(type_byte: u8, value: Bytes, out: &mut Vec<Tlv>) -> Result<(), ProxyProtocolError> {
    match TlvKind::from_byte(type_byte) {
        TlvKind::Ssl => {
            if value.len() < 5 {
                return Err(ProxyProtocolError::TruncatedTlv);
            }
            let client = value[0];
            let verify = i32::from_be_bytes([value[1], value[2], value[3], value[4]]);
            let mut encapsulated = Vec::new();
            parse_tlvs(value.slice(5..), &mut encapsulated)?;
            // The flat list carries the record followed by its children,
            // while the record keeps ownership of the nested parse. Element
            // clones are refcount bumps on the shared value bytes.
            let at = out.len();
            out.extend(encapsulated.iter().cloned());
            out.insert(
                at,
                Tlv::Ssl(SslTlv {
                    client,
                    verify,
                    value,
                    encapsulated,
                }),
            );
        }
        kind => out.push(Tlv::Regular {
            kind,
            type_byte,
            value,
        }),
    }
    Ok(())
}
