//! HAProxy PROXY protocol decoding (v1 text and v2 binary).
//!
//! An upstream proxy prepends a PROXY header to a TCP connection to convey
//! the original peer address. This module detects which protocol version is
//! in play, frames the header out of an arbitrarily fragmented byte stream,
//! and parses it into a [`ProxyMessage`] — including the optional TLV
//! metadata a v2 header can carry.
//!
//! The decoder is single-shot: a connection carries at most one PROXY
//! header, so after emitting a message (or failing) it leaves all further
//! bytes untouched for the next stage of the read path.

mod decoder;
mod message;
mod tlv;

pub use self::decoder::{HaproxyDecoder, ProtocolDetection, MAX_TLV_SIZE};
pub use self::message::{
    AddressFamily, ProxiedProtocol, ProxyCommand, ProxyMessage, ProxyVersion, TransportProtocol,
};
pub use self::tlv::{SslTlv, Tlv, TlvKind};
