//! # route-limit
//!
//! `route-limit` provides lock-free, per-route concurrency accounting.
//!
//! ## Core Philosophy
//!
//! A concurrency limiter sits on the hot path of every request. Guarding a map of counters
//! with a `Mutex` would serialise unrelated routes behind a single lock. `route-limit` fixes
//! the set of routes at construction time, so the map itself is read-only, and each route
//! carries its own atomic counter.
//!
//! ## Key Concepts
//!
//! * **Lock-Free**: No `Mutex` or `RwLock` in the hot path. Route A never contends with route B.
//! * **Count First, Judge Later**: An increment always happens before the check. The caller
//!   compares the returned [`Concurrency`] against its limit and must decrement on every exit
//!   path, whether the request was admitted or not.
//! * **Fail-Open**: Routes that were not configured are never tracked and never limited.
//! * **Limiter Trait**: A unified interface so that other backends can replace [`LocalLimiter`].
//!
//! ## Example
//!
//! ```rust
//! use route_limit::Limiter;
//! use route_limit::LocalLimiter;
//!
//! let limiter = LocalLimiter::new([("GET /users/me", 2)]);
//!
//! let concurrency = limiter.increment_concurrency("GET /users/me");
//! if !concurrency.is_exceeded() {
//!     // Request allowed
//! }
//! limiter.decrement_concurrency("GET /users/me");
//! assert_eq!(limiter.concurrency("GET /users/me"), 0);
//! ```

use std::fmt::Debug;
use std::sync::Arc;

mod local;

#[cfg(test)]
mod tests;

pub use local::LocalLimiter;

/// The in-flight count of a route observed by an increment, together with its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Concurrency {
    /// Number of in-flight requests, including the one which produced this value.
    pub current: usize,
    /// The configured maximum for the route.
    pub max: usize,
}

impl Concurrency {
    /// Returned for routes the limiter does not track.
    pub const UNTRACKED: Concurrency = Concurrency { current: 0, max: 0 };

    /// Create a new `Concurrency`.
    pub const fn new(current: usize, max: usize) -> Self {
        Self { current, max }
    }

    /// `true` if this request pushed the route over its limit.
    ///
    /// The comparison is strict, so a route configured with `max` admits exactly `max`
    /// concurrent requests.
    pub const fn is_exceeded(&self) -> bool {
        self.current > self.max
    }

    /// `false` if the route is not tracked by the limiter.
    ///
    /// A tracked route always reports at least the request which incremented it.
    pub const fn is_tracked(&self) -> bool {
        self.current > 0
    }
}

/// The core trait for all concurrency-limiting backends.
///
/// Limiters must be `Send` and `Sync` to allow sharing across thread boundaries
/// via `Arc`. Every method is non-blocking.
pub trait Limiter: Debug + Send + Sync {
    /// Atomically increment the in-flight count of `route` and return the new count
    /// together with the route's limit.
    ///
    /// Unknown routes return [`Concurrency::UNTRACKED`] and are not recorded.
    fn increment_concurrency(&self, route: &str) -> Concurrency;

    /// Atomically decrement the in-flight count of `route`.
    ///
    /// Does nothing for unknown routes. Must be called exactly once for every
    /// [`increment_concurrency`](Limiter::increment_concurrency) on the same route.
    fn decrement_concurrency(&self, route: &str);

    /// Read the in-flight count of `route`, or `0` for unknown routes.
    fn concurrency(&self, route: &str) -> usize;

    /// The configured maximum for `route`, if the limiter tracks it.
    fn max_concurrency(&self, _route: &str) -> Option<usize> {
        None
    }
}

macro_rules! forward_limiter {
    ($($ty:ty),*) => {
        $(
            impl<L> Limiter for $ty
            where
                L: Limiter + ?Sized,
            {
                fn increment_concurrency(&self, route: &str) -> Concurrency {
                    (**self).increment_concurrency(route)
                }

                fn decrement_concurrency(&self, route: &str) {
                    (**self).decrement_concurrency(route)
                }

                fn concurrency(&self, route: &str) -> usize {
                    (**self).concurrency(route)
                }

                fn max_concurrency(&self, route: &str) -> Option<usize> {
                    (**self).max_concurrency(route)
                }
            }
        )*
    };
}

forward_limiter!(&L, Box<L>, Arc<L>);
