use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relay_core::protocol::FrameDecoder;

fn event_stream(frames: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for i in 0..frames {
        bytes.extend_from_slice(
            format!(
                "event:message\ndata:{{\"status\":0,\"data\":{{\"message\":{{\"threadId\":\"t1\",\"msgId\":\"m{}\",\"endTurn\":false,\"content\":[{{\"dataType\":\"markdown\",\"isFinished\":false,\"data\":{{\"text\":\"深度思考 chunk {}\"}}}}]}}}}}}\n\n",
                i, i
            )
            .as_bytes(),
        );
        if i % 10 == 0 {
            bytes.extend_from_slice(b"event:ping\ndata:{}\n\n");
        }
    }
    bytes
}

fn bench_decode(c: &mut Criterion) {
    let input = event_stream(500);
    let mut group = c.benchmark_group("frame_decoder");
    group.throughput(Throughput::Bytes(input.len() as u64));

    for chunk_size in [7usize, 64, 1024, usize::MAX] {
        let label = if chunk_size == usize::MAX {
            "whole".to_string()
        } else {
            chunk_size.to_string()
        };
        group.bench_with_input(BenchmarkId::from_parameter(label), &chunk_size, |b, &size| {
            b.iter(|| {
                let mut decoder = FrameDecoder::new();
                let mut count = 0;
                for chunk in input.chunks(size.min(input.len())) {
                    count += decoder.decode(black_box(chunk)).len();
                }
                decoder.finish();
                count
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
