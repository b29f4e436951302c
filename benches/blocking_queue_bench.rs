use criterion::{black_box, criterion_group, criterion_main, Criterion};
use guarded_collections::{BlockingQueue, ConcurrentQueue};
use std::sync::Arc;
use std::time::Duration;

fn bench_enqueue_dequeue_ready(c: &mut Criterion) {
    c.bench_function("blocking_queue_ready_item", |b| {
        let q = BlockingQueue::new();
        b.iter(|| {
            q.enqueue(black_box(1u64));
            black_box(q.try_dequeue(Duration::from_secs(1)))
        })
    });
}

fn bench_concurrent_queue_baseline(c: &mut Criterion) {
    c.bench_function("concurrent_queue_enqueue_dequeue", |b| {
        let q = ConcurrentQueue::new();
        b.iter(|| {
            q.enqueue(black_box(1u64));
            black_box(q.try_dequeue())
        })
    });
}

fn bench_handoff(c: &mut Criterion) {
    c.bench_function("blocking_queue_handoff_1k", |b| {
        b.iter(|| {
            let q: Arc<BlockingQueue<u32>> = Arc::new(BlockingQueue::new());
            let consumer = {
                let q = Arc::clone(&q);
                std::thread::spawn(move || {
                    let mut n = 0;
                    while n < 1_000 {
                        if q.try_dequeue(Duration::from_secs(1)).is_some() {
                            n += 1;
                        }
                    }
                    n
                })
            };
            for i in 0..1_000 {
                q.enqueue(i);
            }
            black_box(consumer.join().unwrap())
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(30)
        .measurement_time(Duration::from_secs(6))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_enqueue_dequeue_ready, bench_concurrent_queue_baseline, bench_handoff
}
criterion_main!(benches);
