//! Throughput Benchmark for filedock
//!
//! Measures request framing, header decoding, payload decoding and the
//! directory-backed store under various workloads.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use filedock::commands::CommandHandler;
use filedock::protocol::{decode, decode_payload, encode_chunked, encode_payload, find_terminator};
use filedock::storage::{FileStore, StorageBackend};
use std::sync::Arc;
use std::time::Duration;

/// Builds an UPLOAD request carrying `size` raw bytes
fn upload_request(size: usize) -> Vec<u8> {
    let mut raw = b"UPLOAD bench.bin\r\n".to_vec();
    raw.extend_from_slice(encode_payload(&vec![0xAB; size]).as_bytes());
    raw.extend_from_slice(b"\r\n\r\n");
    raw
}

/// Benchmark terminator scanning
fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");

    for size in [1024, 64 * 1024, 1024 * 1024] {
        let raw = upload_request(size);
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_function(format!("find_terminator_{}", size), |b| {
            b.iter(|| black_box(find_terminator(black_box(&raw), 0)));
        });
    }

    group.finish();
}

/// Benchmark request decoding
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    group.bench_function("list", |b| {
        b.iter(|| black_box(decode(black_box(b"LIST"))));
    });

    group.bench_function("get_quoted", |b| {
        b.iter(|| black_box(decode(black_box(b"GET 'my holiday photo.jpg'"))));
    });

    let raw = upload_request(64 * 1024);
    let end = find_terminator(&raw, 0).unwrap_or(raw.len());
    group.bench_function("upload_64k", |b| {
        b.iter(|| black_box(decode(black_box(&raw[..end]))));
    });

    group.finish();
}

/// Benchmark base64 payload decoding
fn bench_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload");
    let data = vec![0x5Au8; 1024 * 1024];
    group.throughput(Throughput::Bytes(data.len() as u64));

    let single = encode_payload(&data);
    group.bench_function("decode_single", |b| {
        b.iter(|| black_box(decode_payload(black_box(&single))));
    });

    // 1000-byte chunks leave padding inside the payload
    let chunked = encode_chunked(&data, 1000);
    group.bench_function("decode_chunked", |b| {
        b.iter(|| black_box(decode_payload(black_box(&chunked))));
    });

    group.finish();
}

/// Benchmark the file store through the dispatcher
fn bench_store(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let commands = CommandHandler::new(Arc::clone(&store));

    let mut group = c.benchmark_group("store");
    group.throughput(Throughput::Elements(1));

    let small = upload_request(1024);
    let end = find_terminator(&small, 0).unwrap_or(small.len());
    group.bench_function("upload_1k", |b| {
        b.iter(|| black_box(commands.execute(&small[..end])));
    });

    group.bench_function("get_1k", |b| {
        b.iter(|| black_box(commands.execute(b"GET bench.bin")));
    });

    for i in 0..200 {
        store
            .upload(&format!("file_{}.txt", i), "aGVsbG8=")
            .unwrap();
    }
    group.bench_function("list_200", |b| {
        b.iter(|| black_box(commands.execute(b"LIST")));
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_upload_get", |b| {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..100 {
                            let name = format!("file_{}_{}.bin", t, i);
                            store.upload(&name, "AAECAwQFBgc=").unwrap();
                            black_box(store.download(&name).unwrap());
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_framing,
    bench_decode,
    bench_payload,
    bench_store,
    bench_concurrent,
);

criterion_main!(benches);
