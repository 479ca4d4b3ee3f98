//! Codec adapters for tokio.
//!
//! This module wires the pure decoders and the encoder into
//! [`tokio_util::codec`] so they slot straight into `Framed` transports.
//! Everything here delegates to the core types; only the integration (and
//! its tracing) lives at this layer.
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use gangway_proto::codec::RespCodec;
//! use gangway_proto::resp::RespMessage;
//! use tokio::net::TcpStream;
//! use tokio_util::codec::Framed;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:6379").await?;
//! let mut framed = Framed::new(stream, RespCodec::new());
//! while let Some(msg) = framed.next().await {
//!     match msg? {
//!         RespMessage::SimpleString(s) => println!("reply: {:?}", s),
//!         other => println!("{:?}", other),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{ProxyProtocolError, RespCodecError};
use crate::haproxy::{HaproxyDecoder, ProxyMessage};
use crate::resp::{RespDecoder, RespEncoder, RespMessage};

impl Decoder for HaproxyDecoder {
    type Item = ProxyMessage;
    type Error = ProxyProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<ProxyMessage>, ProxyProtocolError> {
        let decoded = HaproxyDecoder::decode(self, src)?;
        if let Some(msg) = &decoded {
            tracing::trace!(
                version = ?msg.version(),
                protocol = ?msg.protocol(),
                "decoded PROXY header"
            );
        }
        Ok(decoded)
    }
}

impl Decoder for RespDecoder {
    type Item = RespMessage;
    type Error = RespCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RespMessage>, RespCodecError> {
        RespDecoder::decode(self, src)
    }
}

/// Paired RESP decoder and encoder for use with `Framed`.
///
/// Decoding yields framing-level messages; run them through the aggregators
/// in [`crate::resp`] if whole bulk strings and array trees are wanted.
#[derive(Debug, Default)]
pub struct RespCodec {
    decoder: RespDecoder,
    encoder: RespEncoder,
}

impl RespCodec {
    /// Create a codec with default decoder settings and the shared pool.
    pub fn new() -> RespCodec {
        RespCodec::default()
    }

    /// Enable or disable inline commands on the decoding side.
    pub fn inline_commands(mut self, enabled: bool) -> RespCodec {
        self.decoder = self.decoder.inline_commands(enabled);
        self
    }

    /// Set the maximum inline message length on the decoding side.
    pub fn max_inline_length(mut self, max: usize) -> RespCodec {
        self.decoder = self.decoder.max_inline_length(max);
        self
    }
}

impl Decoder for RespCodec {
    type Item = RespMessage;
    type Error = RespCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RespMessage>, RespCodecError> {
        let result = self.decoder.decode(src);
        if let Err(err) = &result {
            tracing::debug!(error = %err, "RESP decode failed, state reset");
        }
        result
    }
}

impl Encoder<RespMessage> for RespCodec {
    type Error = RespCodecError;

    fn encode(&mut self, msg: RespMessage, dst: &mut BytesMut) -> Result<(), RespCodecError> {
        self.encoder.encode_to_buf(&msg, dst);
        Ok(())
    }
}
