use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use more_asserts::assert_ge;
use more_asserts::assert_le;

use super::*;

// A limiter which tracks nothing, used to check the trait is usable as an object
#[derive(Debug)]
struct NoopLimiter;

impl Limiter for NoopLimiter {
    fn increment_concurrency(&self, _route: &str) -> Concurrency {
        Concurrency::UNTRACKED
    }

    fn decrement_concurrency(&self, _route: &str) {}

    fn concurrency(&self, _route: &str) -> usize {
        0
    }
}

fn hammer(limiter: Arc<dyn Limiter>, route: &'static str, threads: usize, per_thread: usize) {
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    limiter.increment_concurrency(route);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }
}

#[test]
fn test_no_lost_increments() {
    let limiter: Arc<dyn Limiter> = Arc::new(LocalLimiter::new([("GET /users/me", 2)]));

    hammer(Arc::clone(&limiter), "GET /users/me", 8, 10_000);

    assert_eq!(limiter.concurrency("GET /users/me"), 80_000);
}

#[test]
fn test_balanced_interleaving_returns_to_zero() {
    let limiter = Arc::new(LocalLimiter::new([("GET /a", 4), ("GET /b", 4)]));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let limiter = Arc::clone(&limiter);
            let barrier = Arc::clone(&barrier);
            let route = if i % 2 == 0 { "GET /a" } else { "GET /b" };
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..5_000 {
                    let concurrency = limiter.increment_concurrency(route);
                    // Every other thread on this route can hold at most one slot
                    assert_ge!(concurrency.current, 1);
                    assert_le!(concurrency.current, threads / 2);
                    limiter.decrement_concurrency(route);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked");
    }

    assert_eq!(limiter.concurrency("GET /a"), 0);
    assert_eq!(limiter.concurrency("GET /b"), 0);
}

#[test]
fn test_routes_are_independent() {
    let limiter = LocalLimiter::new([("GET /a", 1), ("GET /b", 1)]);

    assert!(!limiter.increment_concurrency("GET /a").is_exceeded());
    assert!(limiter.increment_concurrency("GET /a").is_exceeded());

    // Saturating /a does not affect /b
    assert_eq!(limiter.increment_concurrency("GET /b"), Concurrency::new(1, 1));
}

#[test]
fn test_unknown_routes_are_never_recorded() {
    let limiter: Arc<dyn Limiter> = Arc::new(LocalLimiter::new([("GET /a", 1)]));

    hammer(Arc::clone(&limiter), "GET /unknown", 4, 1_000);

    assert_eq!(limiter.concurrency("GET /unknown"), 0);
    assert_eq!(
        limiter.increment_concurrency("GET /unknown"),
        Concurrency::UNTRACKED
    );
    assert_eq!(limiter.concurrency("GET /a"), 0);
}

#[test]
fn test_forwarding_impls() {
    let local = LocalLimiter::new([("GET /a", 3)]);

    let by_ref: &dyn Limiter = &&local;
    assert_eq!(by_ref.increment_concurrency("GET /a"), Concurrency::new(1, 3));
    assert_eq!(by_ref.max_concurrency("GET /a"), Some(3));

    let boxed: Box<dyn Limiter> = Box::new(local);
    assert_eq!(boxed.increment_concurrency("GET /a"), Concurrency::new(2, 3));

    let arc = Arc::new(boxed);
    arc.decrement_concurrency("GET /a");
    arc.decrement_concurrency("GET /a");
    assert_eq!(arc.concurrency("GET /a"), 0);
}

#[test]
fn test_default_max_concurrency() {
    let noop: Box<dyn Limiter> = Box::new(NoopLimiter);

    assert_eq!(noop.max_concurrency("GET /a"), None);
    assert!(!noop.increment_concurrency("GET /a").is_exceeded());
}
