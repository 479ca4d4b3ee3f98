//! RESP (Redis Serialization Protocol) codec.
//!
//! The pipeline has three stages. [`RespDecoder`] turns an arbitrarily
//! fragmented byte stream into framing-level primitives (type-marked lines,
//! bulk-string headers and streamed chunks, array headers). The aggregators
//! — [`BulkStringAggregator`] and [`ArrayAggregator`] — coalesce those
//! primitives into whole values: contiguous bulk strings and nested array
//! trees. [`RespEncoder`] goes the other way, rendering [`RespMessage`]
//! values back into wire buffers without copying bulk payloads.
//!
//! Common replies (`+OK`, small integers, canonical errors) are interned in
//! a process-wide [`MessagePool`] so the hot path allocates nothing.

mod aggregator;
mod decoder;
mod encoder;
mod message;
mod pool;

pub use self::aggregator::{ArrayAggregator, BulkStringAggregator};
pub use self::decoder::RespDecoder;
pub use self::encoder::RespEncoder;
pub use self::message::{
    RespMessage, RespMessageType, DEFAULT_MAX_INLINE_LENGTH, MAX_VALUE_LENGTH,
};
pub use self::pool::MessagePool;
