//! Error types for the gangway codecs.
//!
//! This module defines error types for PROXY protocol parsing failures,
//! RESP codec failures, and message aggregation issues.

use thiserror::Error;

/// Convenience type alias for results produced by the PROXY decoder.
pub type ProxyResult<T> = std::result::Result<T, ProxyProtocolError>;

/// Convenience type alias for results produced by the RESP codec.
pub type RespResult<T> = std::result::Result<T, RespCodecError>;

/// Errors raised while decoding a PROXY protocol header.
///
/// All of these are fatal for the connection: the decoder marks itself
/// finished and the transport is expected to close once one surfaces.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProxyProtocolError {
    /// The first bytes match neither the v1 text nor the v2 binary signature.
    #[error("unrecognized PROXY protocol signature")]
    InvalidSignature,

    /// The v2 version nibble was not `0x2`.
    #[error("unsupported PROXY version byte {0:#04x}")]
    InvalidVersion(u8),

    /// The v2 command nibble was neither LOCAL nor PROXY.
    #[error("unsupported PROXY command byte {0:#04x}")]
    InvalidCommand(u8),

    /// The v2 transport-protocol/address-family byte is not a defined combination.
    #[error("unsupported transport protocol byte {0:#04x}")]
    InvalidProtocolByte(u8),

    /// A v1 header named a protocol the text form does not support (e.g. `UDP4`).
    #[error("unsupported v1 protocol: {0}")]
    UnsupportedV1Protocol(String),

    /// A v1 header did not have the expected number of space-separated tokens.
    #[error("invalid v1 header: expected {expected} tokens, got {got}")]
    InvalidTokenCount {
        /// Token count required for this protocol.
        expected: usize,
        /// Token count actually present.
        got: usize,
    },

    /// An address literal did not match its declared address family.
    #[error("invalid {family} address: {value}")]
    InvalidAddress {
        /// Address family the header declared.
        family: &'static str,
        /// The offending literal.
        value: String,
    },

    /// A port field was not a decimal number in 1..=65535.
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// A header line was not terminated by CRLF.
    #[error("header must end in CRLF")]
    InvalidEndOfLine,

    /// A header was structurally broken in a way no other variant captures.
    #[error("malformed header: {0}")]
    Malformed(&'static str),

    /// A header exceeded the configured maximum and was discarded.
    #[error("header exceeds {limit} bytes ({discarded} discarded)")]
    HeaderTooLong {
        /// Configured maximum header size.
        limit: usize,
        /// Bytes dropped so far while resynchronizing.
        discarded: usize,
    },

    /// The address block was shorter than the declared family requires.
    #[error("address block too short for {family}: {got} bytes (need {needed})")]
    TruncatedAddressBlock {
        /// Address family the header declared.
        family: &'static str,
        /// Bytes actually present.
        got: usize,
        /// Bytes the family layout requires.
        needed: usize,
    },

    /// A TLV record ran past the end of its enclosing section.
    #[error("truncated TLV record")]
    TruncatedTlv,

    /// I/O error from the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding or encoding RESP frames.
///
/// Unlike PROXY errors these are not inherently fatal: the decoder resets
/// itself to the type state before surfacing one, and the transport decides
/// whether the connection survives.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RespCodecError {
    /// The first byte of a frame is not a known type marker
    /// (and inline commands are disabled).
    #[error("unknown message type byte {0:#04x}")]
    UnknownType(u8),

    /// A declared length was below -1 or above the 512 MiB value cap.
    #[error("length {0} out of range")]
    InvalidLength(i64),

    /// A decimal field contained a byte outside `0..=9`.
    #[error("unexpected byte {byte:#04x} in decimal field")]
    NonDigit {
        /// The offending byte.
        byte: u8,
    },

    /// A decimal field was longer than an i64 can carry.
    #[error("decimal field longer than {limit} digits")]
    IntegerTooLong {
        /// Maximum digit count after the optional sign.
        limit: usize,
    },

    /// An inline message exceeded the configured maximum without a line ending.
    #[error("inline message longer than {limit} bytes")]
    InlineTooLong {
        /// Configured inline message cap.
        limit: usize,
    },

    /// Expected a CRLF pair and found something else.
    #[error("expected CRLF delimiter")]
    DelimiterMismatch,

    /// I/O error from the underlying transport.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the bulk-string and array aggregators.
///
/// [`FrameTooLong`](AggregationError::FrameTooLong) is recoverable: the
/// aggregator drops the oversized aggregation and keeps consuming the stream.
/// The other variants indicate a protocol-order violation upstream.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AggregationError {
    /// A start message arrived while an aggregation was already in progress.
    #[error("aggregation already in progress")]
    NestedStart,

    /// A content message arrived without a preceding start message.
    #[error("content without a preceding header")]
    ContentWithoutStart,

    /// Aggregated content would exceed the configured maximum.
    #[error("frame length {length} exceeds {limit}")]
    FrameTooLong {
        /// Declared or accumulated length.
        length: usize,
        /// Configured maximum content length.
        limit: usize,
    },

    /// An array header declared more children than a 32-bit index can address.
    #[error("array length {0} exceeds i32::MAX")]
    ArrayTooLong(u64),
}
