use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use resq_sequencer::Sequencer;

const BATCH: u64 = 1000;

fn bench_in_order_throughput(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("resequence");
    group.throughput(Throughput::Elements(BATCH));
    group.bench_function("in_order_1k", |b| {
        b.iter(|| {
            rt.block_on(async {
                let s = Arc::new(Sequencer::new(Duration::from_millis(50), 0xFFFF));
                // The consumer must run concurrently: the emission queue is
                // bounded and backpressures the emit loop.
                let cancel = CancellationToken::new();
                let consumer = tokio::spawn({
                    let s = s.clone();
                    let cancel = cancel.clone();
                    async move {
                        for _ in 0..BATCH {
                            s.wait_next(&cancel).await.expect("packet");
                        }
                    }
                });
                for n in 0..BATCH {
                    s.add(n, n).await.expect("add");
                }
                consumer.await.expect("consumer");
            });
        });
    });
    group.finish();
}

criterion_group!(benches, bench_in_order_throughput);
criterion_main!(benches);
