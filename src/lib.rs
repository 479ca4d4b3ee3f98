//! # gangway-proto
//!
//! Streaming codecs for the port of entry of a proxied service: the HAProxy
//! PROXY protocol (v1 text and v2 binary, TLVs included) and RESP, the Redis
//! serialization protocol.
//!
//! ## Features
//!
//! - Incremental decoding over arbitrarily fragmented input: every decoder
//!   consumes an accumulation buffer and emits typed messages only once a
//!   frame is complete
//! - PROXY protocol version detection, v1/v2 header parsing, nested SSL TLV
//!   decoding, and discard-mode resynchronization after oversized headers
//! - RESP decoding with streamed bulk strings, structural aggregation into
//!   contiguous bulk strings and nested arrays, and a zero-copy encoder
//! - Interned messages for the hot replies (`+OK`, small integers, canonical
//!   errors) so steady-state decoding allocates nothing
//! - Optional Tokio integration implementing `tokio_util::codec`
//!
//! ## Quick start
//!
//! ```
//! use bytes::BytesMut;
//! use gangway_proto::haproxy::HaproxyDecoder;
//! use gangway_proto::resp::{RespDecoder, RespMessage};
//!
//! // Strip the PROXY header a load balancer prepended...
//! let mut proxy = HaproxyDecoder::new();
//! let mut buf = BytesMut::from(&b"PROXY TCP4 10.0.0.1 10.0.0.2 51234 6379\r\n+OK\r\n"[..]);
//! let header = proxy.decode(&mut buf).unwrap().unwrap();
//! assert_eq!(header.source_address(), Some("10.0.0.1"));
//!
//! // ...and the connection continues in RESP.
//! let mut resp = RespDecoder::new();
//! assert_eq!(resp.decode(&mut buf).unwrap(), Some(RespMessage::simple("OK")));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cursor;
pub mod error;
pub mod haproxy;
pub mod resp;

#[cfg(feature = "tokio")]
pub mod codec;

pub use self::cursor::ByteCursor;
pub use self::error::{
    AggregationError, ProxyProtocolError, ProxyResult, RespCodecError, RespResult,
};
pub use self::haproxy::{HaproxyDecoder, ProtocolDetection, ProxyMessage};
pub use self::resp::{
    ArrayAggregator, BulkStringAggregator, MessagePool, RespDecoder, RespEncoder, RespMessage,
};

#[cfg(feature = "tokio")]
pub use self::codec::RespCodec;
