//! Micro-benchmarks for notification parsing and event decode.
//!
//! The parser runs once per keyspace notification on the listener task,
//! so it has to stay allocation-free. Run with
//! `cargo bench -p hearth-sync -- events`.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use hearth_sync::{Channels, Event, ParsedInput};

fn bench_parse_standard(c: &mut Criterion) {
    let channels = Channels::new(0);
    c.bench_function("parse_standard_expired", |b| {
        b.iter(|| {
            let parsed = channels
                .parse(black_box("__keyspace@0__:session:12345"), black_box(b"expired"))
                .unwrap();
            black_box(parsed)
        });
    });
}

fn bench_parse_detailed(c: &mut Criterion) {
    let channels = Channels::new(0);
    c.bench_function("parse_detailed_hset", |b| {
        b.iter(|| {
            let parsed = channels
                .parse(
                    black_box("__keyspace_detailed@0__:user:12345"),
                    black_box(b"1234-abcdef0123456789:hset:email"),
                )
                .unwrap();
            black_box(parsed)
        });
    });
}

fn bench_decode_table(c: &mut Criterion) {
    let channels = Channels::new(0);
    let cases: Vec<(String, &[u8])> = vec![
        ("__keyspace_detailed@0__:k".into(), b"o:del"),
        ("__keyspace_detailed@0__:h".into(), b"o:hset:field"),
        ("__keyspace_detailed@0__:z".into(), b"o:zadd:777"),
        (
            "__keyspace_detailed@0__:z".into(),
            b"o:zremrangebyscore:1.5-9.0-2",
        ),
    ];

    c.bench_function("decode_detailed_mix", |b| {
        b.iter(|| {
            for (channel, payload) in &cases {
                let parsed = channels.parse(black_box(channel), black_box(payload)).unwrap();
                if let ParsedInput::Detailed { key, event, arg, .. } = parsed {
                    black_box(Event::decode_detailed(key, event, arg));
                }
            }
        });
    });
}

criterion_group!(
    benches,
    bench_parse_standard,
    bench_parse_detailed,
    bench_decode_table
);
criterion_main!(benches);
