//! Structural aggregation of framing-level RESP primitives.
//!
//! The decoder emits bulk strings as a header plus streamed chunks, and
//! arrays as a header followed by their children one by one. These two
//! stages coalesce that stream back into whole values. Stack them after the
//! decoder, bulk first:
//!
//! ```
//! use bytes::BytesMut;
//! use gangway_proto::resp::{ArrayAggregator, BulkStringAggregator, RespDecoder, RespMessage};
//!
//! let mut decoder = RespDecoder::new();
//! let mut bulk = BulkStringAggregator::new();
//! let mut array = ArrayAggregator::new();
//!
//! let mut buf = BytesMut::from(&b"*2\r\n$4\r\nLLEN\r\n$6\r\nmylist\r\n"[..]);
//! let mut out = Vec::new();
//! while let Some(msg) = decoder.decode(&mut buf).unwrap() {
//!     let Some(msg) = bulk.push(msg).unwrap() else { continue };
//!     if let Some(msg) = array.push(msg).unwrap() {
//!         out.push(msg);
//!     }
//! }
//! assert_eq!(
//!     out,
//!     vec![RespMessage::array(vec![
//!         RespMessage::bulk("LLEN"),
//!         RespMessage::bulk("mylist"),
//!     ])]
//! );
//! ```

use bytes::BytesMut;
use smallvec::SmallVec;

use crate::error::AggregationError;
use crate::resp::message::{RespMessage, MAX_VALUE_LENGTH};

/// Coalesces a bulk-string header and its streamed chunks into one
/// contiguous [`RespMessage::FullBulkString`].
///
/// Every other message passes through untouched. An aggregation that would
/// exceed the configured cap is dropped and reported; the chunks of the
/// oversized value are then swallowed until its last chunk passes, so the
/// stream stays usable.
#[derive(Debug)]
pub struct BulkStringAggregator {
    max_content_length: usize,
    buffer: Option<BytesMut>,
    /// Swallowing the remainder of an oversized bulk string.
    ignoring: bool,
}

impl Default for BulkStringAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl BulkStringAggregator {
    /// Create an aggregator with the protocol's 512 MiB cap.
    pub fn new() -> BulkStringAggregator {
        Self::with_max_content_length(MAX_VALUE_LENGTH)
    }

    /// Create an aggregator with a custom content cap.
    pub fn with_max_content_length(max_content_length: usize) -> BulkStringAggregator {
        BulkStringAggregator {
            max_content_length,
            buffer: None,
            ignoring: false,
        }
    }

    /// Whether an aggregation is currently in progress.
    pub fn is_aggregating(&self) -> bool {
        self.buffer.is_some()
    }

    /// Feed one message through the aggregator.
    pub fn push(
        &mut self,
        msg: RespMessage,
    ) -> Result<Option<RespMessage>, AggregationError> {
        match msg {
            RespMessage::BulkStringHeader(length) => {
                if self.buffer.take().is_some() {
                    return Err(AggregationError::NestedStart);
                }
                if length > self.max_content_length {
                    self.ignoring = true;
                    return Err(AggregationError::FrameTooLong {
                        length,
                        limit: self.max_content_length,
                    });
                }
                // The header told us the final size; one exact allocation.
                self.buffer = Some(BytesMut::with_capacity(length));
                Ok(None)
            }
            RespMessage::BulkStringContent { data, last } => {
                if self.ignoring {
                    if last {
                        self.ignoring = false;
                    }
                    return Ok(None);
                }
                let Some(buffer) = self.buffer.as_mut() else {
                    return Err(AggregationError::ContentWithoutStart);
                };
                if buffer.len() + data.len() > self.max_content_length {
                    let length = buffer.len() + data.len();
                    self.buffer = None;
                    self.ignoring = !last;
                    return Err(AggregationError::FrameTooLong {
                        length,
                        limit: self.max_content_length,
                    });
                }
                buffer.extend_from_slice(&data);
                if last {
                    let whole = self.buffer.take().map(BytesMut::freeze);
                    Ok(Some(RespMessage::FullBulkString(whole)))
                } else {
                    Ok(None)
                }
            }
            other => Ok(Some(other)),
        }
    }
}

#[derive(Debug)]
struct Frame {
    length: usize,
    children: Vec<RespMessage>,
}

/// Folds array headers and fully-resolved children into nested
/// [`RespMessage::Array`] trees.
///
/// Feed it the output of the bulk aggregator. Null and empty headers
/// resolve immediately; a positive header opens a frame that collects the
/// next `length` messages (recursively, for nested arrays) before the
/// assembled array pops out — either as output or as a child of the frame
/// below it.
#[derive(Debug, Default)]
pub struct ArrayAggregator {
    stack: SmallVec<[Frame; 4]>,
}

impl ArrayAggregator {
    /// Create an empty aggregator.
    pub fn new() -> ArrayAggregator {
        ArrayAggregator::default()
    }

    /// Whether any array is currently being assembled.
    pub fn is_aggregating(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Feed one message through the aggregator.
    pub fn push(
        &mut self,
        msg: RespMessage,
    ) -> Result<Option<RespMessage>, AggregationError> {
        match msg {
            RespMessage::ArrayHeader(None) => Ok(self.complete(RespMessage::Array(None))),
            RespMessage::ArrayHeader(Some(0)) => {
                Ok(self.complete(RespMessage::Array(Some(Vec::new()))))
            }
            RespMessage::ArrayHeader(Some(length)) => {
                if length > i32::MAX as u64 {
                    return Err(AggregationError::ArrayTooLong(length));
                }
                self.stack.push(Frame {
                    length: length as usize,
                    // The declared length is attacker-controlled; cap the
                    // pre-allocation and let the vector grow past it.
                    children: Vec::with_capacity((length as usize).min(64)),
                });
                Ok(None)
            }
            other => Ok(self.complete(other)),
        }
    }

    /// Append a resolved message to the innermost frame, cascading every
    /// frame that filled up. With no open frame the message passes through.
    fn complete(&mut self, msg: RespMessage) -> Option<RespMessage> {
        let mut msg = msg;
        while let Some(mut top) = self.stack.pop() {
            top.children.push(msg);
            if top.children.len() < top.length {
                self.stack.push(top);
                return None;
            }
            msg = RespMessage::Array(Some(top.children));
        }
        Some(msg)
    }
}
