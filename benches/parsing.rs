//! Benchmarks for PROXY header and RESP message parsing and encoding.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gangway_proto::haproxy::HaproxyDecoder;
use gangway_proto::resp::{RespDecoder, RespEncoder, RespMessage};

/// Simple status reply
const SIMPLE_REPLY: &[u8] = b"+OK\r\n";

/// Integer reply
const INTEGER_REPLY: &[u8] = b":12345\r\n";

/// Bulk string reply
const BULK_REPLY: &[u8] = b"$6\r\nfoobar\r\n";

/// Nested array reply
const NESTED_ARRAY: &[u8] = b"*2\r\n*3\r\n:1\r\n:2\r\n:3\r\n*2\r\n+Foo\r\n-Bar\r\n";

/// v1 text PROXY header
const PROXY_V1: &[u8] = b"PROXY TCP4 192.168.0.1 192.168.0.11 56324 443\r\n";

/// v2 binary PROXY header (TCP4)
const PROXY_V2: &[u8] = b"\r\n\r\n\x00\r\nQUIT\n\x21\x11\x00\x0c\xc0\xa8\x00\x01\xc0\xa8\x00\x0b\xdc\x04\x01\xbb";

fn drain(decoder: &mut RespDecoder, buf: &mut BytesMut) -> usize {
    let mut count = 0;
    while let Some(msg) = decoder.decode(buf).unwrap() {
        black_box(msg);
        count += 1;
    }
    count
}

fn benchmark_resp_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("RESP Decoding");

    for (name, input) in [
        ("simple_string", SIMPLE_REPLY),
        ("integer", INTEGER_REPLY),
        ("bulk_string", BULK_REPLY),
        ("nested_array", NESTED_ARRAY),
    ] {
        group.bench_function(name, |b| {
            let mut decoder = RespDecoder::new();
            b.iter(|| {
                let mut buf = BytesMut::from(black_box(input));
                drain(&mut decoder, &mut buf)
            })
        });
    }

    group.finish();
}

fn benchmark_resp_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("RESP Encoding");
    let encoder = RespEncoder::new();

    let cases = [
        ("simple_string", RespMessage::simple("OK")),
        ("pooled_integer", RespMessage::Integer(42)),
        ("large_integer", RespMessage::Integer(9_876_543_210)),
        ("full_bulk_string", RespMessage::bulk("foobar")),
        (
            "nested_array",
            RespMessage::array(vec![
                RespMessage::array(vec![
                    RespMessage::Integer(1),
                    RespMessage::Integer(2),
                    RespMessage::Integer(3),
                ]),
                RespMessage::array(vec![
                    RespMessage::simple("Foo"),
                    RespMessage::error("Bar"),
                ]),
            ]),
        ),
    ];

    for (name, msg) in cases {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut out = Vec::new();
                encoder.encode(black_box(&msg), &mut out);
                black_box(out)
            })
        });
    }

    group.finish();
}

fn benchmark_proxy_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("PROXY Header Decoding");

    group.bench_function("v1_tcp4", |b| {
        b.iter(|| {
            let mut decoder = HaproxyDecoder::new();
            let mut buf = BytesMut::from(black_box(PROXY_V1));
            black_box(decoder.decode(&mut buf).unwrap())
        })
    });

    group.bench_function("v2_tcp4", |b| {
        b.iter(|| {
            let mut decoder = HaproxyDecoder::new();
            let mut buf = BytesMut::from(black_box(PROXY_V2));
            black_box(decoder.decode(&mut buf).unwrap())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_resp_decode,
    benchmark_resp_encode,
    benchmark_proxy_decode
);
criterion_main!(benches);
