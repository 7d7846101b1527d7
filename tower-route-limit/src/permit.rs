use std::sync::Arc;

use route_limit::Concurrency;
use route_limit::Limiter;

/// One increment of a route's in-flight count.
///
/// The increment happens in [`acquire`](ConcurrencyPermit::acquire) and the matching
/// decrement when the permit is dropped, whichever way the request ends: a response, an
/// error, a panic unwinding through the inner future, or the future being cancelled.
#[derive(Debug)]
pub struct ConcurrencyPermit<L>
where
    L: Limiter + ?Sized,
{
    limiter: Arc<L>,
    route: String,
    concurrency: Concurrency,
}

impl<L> ConcurrencyPermit<L>
where
    L: Limiter + ?Sized,
{
    /// Increment the in-flight count of `route`.
    ///
    /// The permit is returned even when the limit is exceeded, the caller decides what to do
    /// with an over-limit [`Concurrency`].
    pub fn acquire(limiter: Arc<L>, route: String) -> Self {
        let concurrency = limiter.increment_concurrency(&route);
        Self {
            limiter,
            route,
            concurrency,
        }
    }

    /// The count observed when the permit was acquired.
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// The route this permit counts against.
    pub fn route(&self) -> &str {
        &self.route
    }
}

impl<L> Drop for ConcurrencyPermit<L>
where
    L: Limiter + ?Sized,
{
    fn drop(&mut self) {
        self.limiter.decrement_concurrency(&self.route);
    }
}
