// BlockingQueue timing suite.
//
// Invariants exercised:
// - A cross-thread enqueue wakes a waiting consumer well before its timeout.
// - An empty queue reports failure only once the timeout has elapsed.
// - Many consumers can wait at once; each item is delivered exactly once.
use guarded_collections::{BlockingQueue, CollectionError};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Test: enqueue on one thread, dequeue with a 1s timeout on another.
// Verifies: the item arrives and the wait ends long before 1s.
#[test]
fn cross_thread_dequeue_returns_before_timeout() {
    init_tracing();
    let q: Arc<BlockingQueue<&'static str>> = Arc::new(BlockingQueue::new());
    let consumer = {
        let q = Arc::clone(&q);
        std::thread::spawn(move || {
            let start = Instant::now();
            let got = q.try_dequeue(Duration::from_secs(1));
            (got, start.elapsed())
        })
    };
    std::thread::sleep(Duration::from_millis(10));
    q.enqueue("x");
    let (got, waited) = consumer.join().unwrap();
    assert_eq!(got, Some("x"));
    assert!(waited < Duration::from_millis(500), "waited {waited:?}");
}

// Test: 50ms timeout on an empty queue.
// Verifies: failure is reported, and not before ~50ms.
#[test]
fn empty_queue_times_out_after_the_deadline() {
    init_tracing();
    let q: BlockingQueue<u32> = BlockingQueue::new();
    let timeout = Duration::from_millis(50);
    let start = Instant::now();
    assert_eq!(q.dequeue_timeout(timeout), Err(CollectionError::TimedOut(timeout)));
    let waited = start.elapsed();
    assert!(waited >= timeout, "returned early after {waited:?}");
    assert!(waited < Duration::from_secs(2), "overslept: {waited:?}");
}

// Test: 4 producers and 4 consumers share one queue.
// Verifies: every item is consumed once; consumers that find nothing
// eventually time out instead of hanging.
#[test]
fn many_producers_and_consumers() {
    const ITEMS: u32 = 400;
    let q: Arc<BlockingQueue<u32>> = Arc::new(BlockingQueue::new());

    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                let mut got = Vec::new();
                while let Some(v) = q.try_dequeue(Duration::from_millis(200)) {
                    got.push(v);
                }
                got
            })
        })
        .collect();
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                for i in 0..ITEMS / 4 {
                    q.enqueue(p * (ITEMS / 4) + i);
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let mut all: Vec<u32> = consumers
        .into_iter()
        .flat_map(|c| c.join().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..ITEMS).collect::<Vec<_>>());
    assert!(q.is_empty());
}

// Test: try_dequeue_with and while_try_dequeue on a pre-filled queue.
// Verifies: no wait when items are present; drain takes everything.
#[test]
fn callbacks_receive_items_in_fifo_order() {
    let q = BlockingQueue::new();
    for i in 0..5 {
        q.enqueue(i);
    }
    let mut first = None;
    assert!(q.try_dequeue_with(|v| first = Some(v), Duration::from_secs(1)));
    assert_eq!(first, Some(0));

    let mut rest = Vec::new();
    assert_eq!(q.while_try_dequeue(|v| rest.push(v), Duration::from_secs(1)), 4);
    assert_eq!(rest, vec![1, 2, 3, 4]);

    let start = Instant::now();
    assert_eq!(q.while_try_dequeue(|_| unreachable!(), Duration::from_millis(20)), 0);
    assert!(start.elapsed() >= Duration::from_millis(20));
}
