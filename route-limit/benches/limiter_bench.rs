use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Barrier;
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use route_limit::Concurrency;
use route_limit::Limiter;
use route_limit::LocalLimiter;

const ROUTES: [&str; 4] = ["GET /users/me", "GET /books/:id", "POST /login", "GET /a"];

// Baseline: the same contract behind a single lock
#[derive(Debug)]
struct MutexLimiter {
    routes: Mutex<HashMap<String, (usize, usize)>>,
}

impl MutexLimiter {
    fn new(max: usize) -> Self {
        let routes = ROUTES
            .iter()
            .map(|route| (route.to_string(), (0, max)))
            .collect();
        Self {
            routes: Mutex::new(routes),
        }
    }
}

impl Limiter for MutexLimiter {
    fn increment_concurrency(&self, route: &str) -> Concurrency {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(route) {
            Some((current, max)) => {
                *current += 1;
                Concurrency::new(*current, *max)
            }
            None => Concurrency::UNTRACKED,
        }
    }

    fn decrement_concurrency(&self, route: &str) {
        let mut routes = self.routes.lock().unwrap();
        if let Some((current, _)) = routes.get_mut(route) {
            *current = current.saturating_sub(1);
        }
    }

    fn concurrency(&self, route: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .get(route)
            .map_or(0, |(current, _)| *current)
    }
}

fn bench_single_limiter<L: Limiter>(group_name: &str, c: &mut Criterion, limiter: Arc<L>) {
    let mut group = c.benchmark_group(group_name);

    group.bench_function("single-threaded", |b| {
        b.iter(|| {
            let l = black_box(limiter.as_ref());
            let _ = black_box(l.increment_concurrency("GET /users/me"));
            l.decrement_concurrency("GET /users/me");
        })
    });

    group.bench_function("untracked-route", |b| {
        b.iter(|| {
            let _ = black_box(limiter.as_ref()).increment_concurrency("GET /unknown");
        })
    });

    group.finish();
}

fn bench_parallel_limiter<L: Limiter + 'static>(
    group_name: &str,
    c: &mut Criterion,
    limiter: Arc<L>,
    spread: bool,
) {
    let mut group = c.benchmark_group(group_name);

    for threads in [2, 4, 8].iter() {
        let num_threads = *threads;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}-threads", num_threads)),
            &num_threads,
            |b, &n| {
                b.iter_custom(|iters| {
                    let barrier = Arc::new(Barrier::new(n + 1));
                    let mut handles = Vec::with_capacity(n);

                    for i in 0..n {
                        let l = Arc::clone(&limiter);
                        let bar = Arc::clone(&barrier);
                        let iters_per_thread = iters / n as u64;
                        let route = if spread {
                            ROUTES[i % ROUTES.len()]
                        } else {
                            ROUTES[0]
                        };

                        handles.push(thread::spawn(move || {
                            bar.wait(); // Wait for the start signal
                            for _ in 0..iters_per_thread {
                                let _ = black_box(l.increment_concurrency(route));
                                l.decrement_concurrency(route);
                            }
                        }));
                    }

                    // Synchronize the start across all threads
                    barrier.wait();
                    let start = Instant::now();

                    for handle in handles {
                        let _ = handle.join();
                    }

                    start.elapsed()
                });
            },
        );
    }
    group.finish();
}

fn bench_dynamic_limiter(group_name: &str, c: &mut Criterion, limiter: Arc<dyn Limiter>) {
    let mut group = c.benchmark_group(format!("Dynamic-{}", group_name));

    group.bench_function("single-threaded", |b| {
        b.iter(|| {
            let l = black_box(limiter.as_ref());
            let _ = black_box(l.increment_concurrency("GET /users/me"));
            l.decrement_concurrency("GET /users/me");
        })
    });

    group.finish();
}

fn run_all_benches(c: &mut Criterion) {
    let max = 1_000_000;

    let local = Arc::new(LocalLimiter::new(ROUTES.map(|route| (route, max))));
    let locked = Arc::new(MutexLimiter::new(max));

    // --- 1. Static dispatch ---

    bench_single_limiter("LocalLimiter-Static", c, Arc::clone(&local));
    bench_parallel_limiter("LocalLimiter-SameRoute", c, Arc::clone(&local), false);
    bench_parallel_limiter("LocalLimiter-SpreadRoutes", c, Arc::clone(&local), true);

    bench_single_limiter("MutexLimiter-Static", c, Arc::clone(&locked));
    bench_parallel_limiter("MutexLimiter-SameRoute", c, Arc::clone(&locked), false);
    bench_parallel_limiter("MutexLimiter-SpreadRoutes", c, Arc::clone(&locked), true);

    // --- 2. Dynamic dispatch ---
    // This allows us to see the overhead of Arc<dyn Limiter>

    let limiters: Vec<(&str, Arc<dyn Limiter>)> =
        vec![("LocalLimiter", local), ("MutexLimiter", locked)];

    for (name, limiter) in limiters {
        bench_dynamic_limiter(name, c, limiter);
    }
}

criterion_group!(benches, run_all_benches);
criterion_main!(benches);
