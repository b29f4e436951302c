// ConcurrentMap integration suite.
//
// Invariants exercised:
// - Linearizability: racing writers never lose or duplicate an entry.
// - Atomic get-or-add: the factory runs once per absent key and every
//   racing caller observes the same stored value.
// - Atomic increments: `incr` from many threads sums exactly.
// - Traversal safety: a `lock()` guard excludes writers for its lifetime;
//   snapshots are unaffected by later writes.
use guarded_collections::{ConcurrentMap, Map};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Test: 8 threads each insert 100,000 unique keys.
// Verifies: final size is exactly 800,000 and every key maps to its writer.
#[test]
fn eight_writers_lose_nothing() {
    init_tracing();
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 100_000;
    let m: Arc<ConcurrentMap<u64, u64>> = Arc::new(ConcurrentMap::with_capacity(1 << 10));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let m = Arc::clone(&m);
            std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    assert!(m.try_add(t * PER_THREAD + i, t));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(m.len(), (THREADS * PER_THREAD) as usize);
    let snap: Map<u64, u64> = m.snapshot();
    for (k, t) in snap.iter() {
        assert_eq!(k / PER_THREAD, *t);
    }
}

// Test: N threads call get_or_add on the same absent key at once.
// Verifies: the factory ran exactly once; all callers saw the same value.
#[test]
fn get_or_add_factory_runs_once_under_contention() {
    const THREADS: usize = 16;
    let m: Arc<ConcurrentMap<&'static str, usize>> = Arc::new(ConcurrentMap::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let (m, calls, barrier) = (m.clone(), calls.clone(), barrier.clone());
            std::thread::spawn(move || {
                barrier.wait();
                let v = m.get_or_add("shared", || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    i
                });
                *v
            })
        })
        .collect();
    let seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let stored = m.try_get_value("shared").unwrap();
    assert!(seen.iter().all(|v| *v == stored));
}

// Test: concurrent incr and add_or_update on shared counters.
// Verifies: no lost updates.
#[test]
fn increments_are_atomic() {
    let m: Arc<ConcurrentMap<u8, u64>> = Arc::new(ConcurrentMap::new());
    std::thread::scope(|s| {
        for _ in 0..8 {
            let m = &m;
            s.spawn(move || {
                for i in 0..1_000u64 {
                    m.incr((i % 4) as u8, 1);
                    m.add_or_update(9, || 1, |v| *v += 1);
                }
            });
        }
    });
    for k in 0..4u8 {
        assert_eq!(m.try_get_value(&k), Some(2_000));
    }
    assert_eq!(m.try_get_value(&9), Some(8_000));
}

// Test: a traversal through lock() sees a frozen map.
// Verifies: a writer blocks until the guard drops; snapshots stay frozen.
#[test]
fn lock_guard_excludes_writers_during_traversal() {
    let m: Arc<ConcurrentMap<u32, u32>> = Arc::new((0..100).map(|k| (k, k)).collect());
    let snap = m.snapshot();

    let locked = m.lock();
    let writer = {
        let m = Arc::clone(&m);
        std::thread::spawn(move || {
            m.add(1_000, 0);
        })
    };
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(locked.iter().count(), 100);
    assert!(!locked.contains_key(&1_000));
    drop(locked);
    writer.join().unwrap();

    assert_eq!(m.len(), 101);
    assert_eq!(snap.len(), 100);
}

// Test: conditional removal under contention.
// Verifies: exactly one of many racing try_remove_if calls wins.
#[test]
fn try_remove_if_has_a_single_winner() {
    let m: ConcurrentMap<&'static str, u32> = ConcurrentMap::new();
    m.add("job", 1);
    let wins: usize = std::thread::scope(|s| {
        let hs: Vec<_> = (0..8)
            .map(|_| s.spawn(|| m.try_remove_if("job", |v| *v == 1) as usize))
            .collect();
        hs.into_iter().map(|h| h.join().unwrap()).sum()
    });
    assert_eq!(wins, 1);
    assert!(m.is_empty());
}
