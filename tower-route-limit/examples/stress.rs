use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use hdrhistogram::Histogram;
use http::Request;
use route_limit::Limiter;
use route_limit::LocalLimiter;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower_route_limit::RouteLimitError;
use tower_route_limit::ServiceBuilderExt;

const ROUTES: [(&str, usize); 3] = [
    ("GET /users/me", 100),
    ("GET /books/:id", 1_000),
    ("POST /reports", 10),
];

async fn mock_db_call(_req: Request<()>) -> Result<&'static str, BoxError> {
    // Simulate real-world work (50ms of DB latency)
    sleep(Duration::from_millis(50)).await;
    Ok("success")
}

fn request(route: &str) -> Request<()> {
    let (method, path) = route.split_once(' ').unwrap_or(("GET", route));
    Request::builder()
        .method(method)
        .uri(path)
        .body(())
        .unwrap()
}

#[derive(Default)]
struct Outcomes {
    admitted: usize,
    rejected: usize,
    other: usize,
}

async fn run_load_test<S>(name: &str, svc: S, route: &'static str, total_reqs: usize)
where
    S: Service<Request<()>, Response = &'static str, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send,
{
    let mut hist_elapsed = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap();
    let mut hist_rejected = Histogram::<u64>::new_with_bounds(1, 60_000_000_000, 3).unwrap();

    let mut tasks = JoinSet::new();
    let mut outcomes = Outcomes::default();

    let start = Instant::now();

    let barrier = Arc::new(Barrier::new(total_reqs));

    for _ in 0..total_reqs {
        let mut local_svc = svc.clone();
        let bar = barrier.clone();
        tasks.spawn(async move {
            bar.wait().await;
            let req_start = Instant::now();
            let res = match local_svc.ready().await {
                Ok(ready_svc) => ready_svc.call(request(route)).await,
                Err(e) => Err(e),
            };
            (res, req_start.elapsed())
        });
    }

    while let Some(task) = tasks.join_next().await {
        let (res, elapsed) = task.expect("Task panicked");
        match res {
            Ok(_) => {
                outcomes.admitted += 1;
                hist_elapsed.record(elapsed.as_micros() as u64).unwrap();
            }
            Err(e) if e.is::<RouteLimitError>() => {
                outcomes.rejected += 1;
                hist_rejected.record(elapsed.as_nanos() as u64).unwrap();
            }
            Err(_) => outcomes.other += 1,
        }
    }

    let total_duration = start.elapsed();
    let goodput = outcomes.admitted as f64 / total_duration.as_secs_f64();

    println!("--- {} ({}) ---", name, route);
    println!("Total Duration:  {:.2?}", total_duration);
    println!("Admitted/Total:  {}/{}", outcomes.admitted, total_reqs);
    println!("Success Rate:    {:.2} req/sec (Goodput)", goodput);

    if outcomes.admitted > 0 {
        println!("P50 (Admitted):  {}µs", hist_elapsed.value_at_quantile(0.5));
        println!("P99 (Admitted):  {}µs", hist_elapsed.value_at_quantile(0.99));
    }
    if outcomes.rejected > 0 {
        println!("Rejected:        {}", outcomes.rejected);
        println!("P50 (Rejected):  {}ns", hist_rejected.value_at_quantile(0.5));
        println!("P99 (Rejected):  {}ns", hist_rejected.value_at_quantile(0.99));
    }
    if outcomes.other > 0 {
        println!("Other Errors:    {}", outcomes.other);
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let total_reqs = 10_000;
    let limiter = Arc::new(LocalLimiter::new(ROUTES));

    let svc = ServiceBuilder::new()
        .http_route_limit::<_, ()>(limiter.clone())
        .service_fn(mock_db_call);

    for (route, _) in ROUTES {
        run_load_test("Route Limit", svc.clone(), route, total_reqs).await;
        assert_eq!(limiter.concurrency(route), 0, "{route} leaked a permit");
    }

    run_load_test("Route Limit", svc, "GET /unknown", total_reqs).await;

    // Tower Built-in, a single global limit for comparison
    let tower_svc = ServiceBuilder::new()
        .load_shed()
        .concurrency_limit(100)
        .service_fn(mock_db_call);
    run_load_test("Tower ConcurrencyLimit", tower_svc, "GET /users/me", total_reqs).await;

    Ok(())
}
