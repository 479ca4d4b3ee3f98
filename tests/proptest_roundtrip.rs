//! Property-based tests for the RESP codec.
//!
//! Uses proptest to generate random message trees and verify that:
//! 1. Encoding then decoding is the identity, nulls and nesting included
//! 2. Chunking the wire bytes at arbitrary boundaries never changes the
//!    decoded message sequence
//! 3. The decoder never panics on the encoder's output

use bytes::BytesMut;
use proptest::prelude::*;

use gangway_proto::resp::{
    ArrayAggregator, BulkStringAggregator, RespDecoder, RespEncoder, RespMessage,
};

// =============================================================================
// STRATEGIES - Generators for valid RESP messages
// =============================================================================

/// Simple-string and error content: one line, no CR/LF.
fn line_text_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop::num::u8::ANY.prop_filter("no line breaks", |b| *b != b'\r' && *b != b'\n'),
        0..60,
    )
}

/// Bulk-string payloads are binary-safe: any bytes at all, CRLF included.
fn bulk_payload_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..200)
}

/// Inline commands must not start with a type marker and stay on one line.
fn inline_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,40}").expect("valid regex")
}

/// Leaf messages: everything except arrays.
fn leaf_strategy() -> impl Strategy<Value = RespMessage> {
    prop_oneof![
        line_text_strategy().prop_map(RespMessage::simple),
        line_text_strategy().prop_map(RespMessage::error),
        any::<i64>().prop_map(RespMessage::Integer),
        bulk_payload_strategy().prop_map(RespMessage::bulk),
        Just(RespMessage::null_bulk()),
    ]
}

/// Full message trees: leaves plus nested, empty, and null arrays.
fn message_strategy() -> impl Strategy<Value = RespMessage> {
    leaf_strategy().prop_recursive(3, 48, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner, 0..6).prop_map(RespMessage::array),
            Just(RespMessage::null_array()),
        ]
    })
}

// =============================================================================
// HELPERS
// =============================================================================

fn encode_all(messages: &[RespMessage]) -> BytesMut {
    let encoder = RespEncoder::new();
    let mut wire = BytesMut::new();
    for msg in messages {
        encoder.encode_to_buf(msg, &mut wire);
    }
    wire
}

/// Decode everything currently buffered through the full pipeline.
fn drain(
    decoder: &mut RespDecoder,
    bulk: &mut BulkStringAggregator,
    array: &mut ArrayAggregator,
    buf: &mut BytesMut,
    out: &mut Vec<RespMessage>,
) {
    while let Some(msg) = decoder.decode(buf).expect("decode failure") {
        let Some(msg) = bulk.push(msg).expect("bulk aggregation failure") else {
            continue;
        };
        if let Some(msg) = array.push(msg).expect("array aggregation failure") {
            out.push(msg);
        }
    }
}

fn decode_whole(wire: &[u8]) -> Vec<RespMessage> {
    let mut decoder = RespDecoder::new();
    let mut bulk = BulkStringAggregator::new();
    let mut array = ArrayAggregator::new();
    let mut buf = BytesMut::from(wire);
    let mut out = Vec::new();
    drain(&mut decoder, &mut bulk, &mut array, &mut buf, &mut out);
    out
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The fundamental roundtrip property: decode(encode(m)) == m.
    #[test]
    fn message_roundtrip(msg in message_strategy()) {
        let wire = encode_all(std::slice::from_ref(&msg));
        let decoded = decode_whole(&wire);
        prop_assert_eq!(decoded, vec![msg]);
    }

    /// A sequence of messages roundtrips in order.
    #[test]
    fn sequence_roundtrip(messages in prop::collection::vec(message_strategy(), 1..5)) {
        let wire = encode_all(&messages);
        let decoded = decode_whole(&wire);
        prop_assert_eq!(decoded, messages);
    }

    /// Splitting the wire bytes at arbitrary boundaries and feeding the
    /// pieces one by one yields exactly the same message sequence as one
    /// whole-buffer feed.
    #[test]
    fn chunking_is_invisible(
        messages in prop::collection::vec(message_strategy(), 1..4),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..6),
    ) {
        let wire = encode_all(&messages);
        let expected = decode_whole(&wire);

        let mut positions: Vec<usize> = cuts.iter().map(|ix| ix.index(wire.len() + 1)).collect();
        positions.push(0);
        positions.push(wire.len());
        positions.sort_unstable();
        positions.dedup();

        let mut decoder = RespDecoder::new();
        let mut bulk = BulkStringAggregator::new();
        let mut array = ArrayAggregator::new();
        let mut buf = BytesMut::new();
        let mut out = Vec::new();
        for window in positions.windows(2) {
            buf.extend_from_slice(&wire[window[0]..window[1]]);
            drain(&mut decoder, &mut bulk, &mut array, &mut buf, &mut out);
        }
        prop_assert_eq!(out, expected);
    }

    /// Inline commands roundtrip when the decoder allows them.
    #[test]
    fn inline_command_roundtrip(text in inline_text_strategy()) {
        let msg = RespMessage::inline(text);
        let wire = encode_all(std::slice::from_ref(&msg));

        let mut decoder = RespDecoder::new().inline_commands(true);
        let mut buf = BytesMut::from(&wire[..]);
        let decoded = decoder.decode(&mut buf).expect("decode failure");
        prop_assert_eq!(decoded, Some(msg));
    }

    /// Integers of every magnitude survive the decimal rendering.
    #[test]
    fn integer_roundtrip(value in any::<i64>()) {
        let wire = encode_all(&[RespMessage::Integer(value)]);
        let decoded = decode_whole(&wire);
        prop_assert_eq!(decoded, vec![RespMessage::Integer(value)]);
    }
}
