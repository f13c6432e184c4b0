use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use prodwire::host::{Envelope, MemoryHost, MemoryWrapper};
use prodwire::protocol::read_stream;
use prodwire::{CodecConfig, Encoding, message};

message! {
    struct Document in "bench" as Json {
        title: String,
        #[column]
        revision: u32,
        body: Vec<u8>,
    }
}

message! {
    struct Blob in "bench" as Binary {
        #[column]
        revision: u32,
        body: Vec<u8>,
    }
}

const SIZES: [(&str, usize); 3] = [("64b", 64), ("1kb", 1024), ("64kb", 64 * 1024)];

fn host() -> MemoryHost {
    MemoryHost::new()
        .declare("bench.Document", ["revision"])
        .declare("bench.Blob", ["revision"])
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for (label, size) in SIZES {
        let document = Document {
            title: "bench".to_owned(),
            revision: 1,
            body: vec![0u8; size],
        };
        let blob = Blob {
            revision: 1,
            body: vec![0u8; size],
        };

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("encode_json_{label}"), |b| {
            b.iter(|| black_box(Encoding::Json.encode(&document).unwrap()));
        });
        group.bench_function(format!("encode_binary_{label}"), |b| {
            b.iter(|| black_box(Encoding::Binary.encode(&blob).unwrap()));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for (label, size) in SIZES {
        let document = Encoding::Json
            .encode(&Document {
                body: vec![7u8; size],
                ..Document::default()
            })
            .unwrap();
        let blob = Encoding::Binary
            .encode(&Blob {
                revision: 3,
                body: vec![7u8; size],
            })
            .unwrap();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("decode_json_{label}"), |b| {
            b.iter(|| black_box(Encoding::Json.decode::<Document>(&document).unwrap()));
        });
        group.bench_function(format!("decode_binary_{label}"), |b| {
            b.iter(|| black_box(Encoding::Binary.decode::<Blob>(&blob).unwrap()));
        });
    }

    group.finish();
}

fn bench_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunked");
    let size = 256 * 1024;
    let config = CodecConfig::default().with_chunk_size(16 * 1024);
    let host = host();
    let message = Blob {
        revision: 9,
        body: vec![1u8; size],
    };

    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("push_256kb", |b| {
        b.iter(|| {
            let mut envelope = Envelope::fresh_with(message.clone(), &host, config).unwrap();
            envelope.push().unwrap();
            black_box(envelope);
        });
    });

    let stream = Encoding::Binary.encode(&message).unwrap();
    group.bench_function("read_stream_256kb", |b| {
        b.iter(|| {
            let mut wrapper = MemoryWrapper::new("bench.Blob").with_stream(stream.clone());
            black_box(read_stream(&mut wrapper, config.chunk_size).unwrap());
        });
    });
    group.bench_function("receive_256kb", |b| {
        b.iter(|| {
            let wrapper = Box::new(MemoryWrapper::new("bench.Blob").with_stream(stream.clone()));
            black_box(Envelope::<Blob>::receive(wrapper, config).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_chunked);
criterion_main!(benches);
