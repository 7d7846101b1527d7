use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use super::Concurrency;
use super::Limiter;

#[derive(Debug)]
struct RouteConcurrency {
    max: usize,
    current: AtomicUsize,
}

/// An in-process limiter backed by one atomic counter per route.
///
/// The set of routes is fixed when the limiter is created, so lookups never take a lock.
/// Each route owns an independent counter.
#[derive(Debug, Default)]
pub struct LocalLimiter {
    routes: HashMap<String, RouteConcurrency>,
}

impl Limiter for LocalLimiter {
    fn increment_concurrency(&self, route: &str) -> Concurrency {
        match self.routes.get(route) {
            Some(entry) => {
                let current = entry.current.fetch_add(1, Ordering::AcqRel) + 1;
                Concurrency::new(current, entry.max)
            }
            None => Concurrency::UNTRACKED,
        }
    }

    fn decrement_concurrency(&self, route: &str) {
        if let Some(entry) = self.routes.get(route) {
            // Saturate rather than wrap on an unmatched decrement.
            let _ = entry
                .current
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |val| {
                    val.checked_sub(1)
                });
        }
    }

    fn concurrency(&self, route: &str) -> usize {
        self.routes
            .get(route)
            .map_or(0, |entry| entry.current.load(Ordering::Acquire))
    }

    fn max_concurrency(&self, route: &str) -> Option<usize> {
        self.routes.get(route).map(|entry| entry.max)
    }
}

impl LocalLimiter {
    /// Creates a new `LocalLimiter`.
    ///
    /// # Arguments
    ///
    /// * `limits` - Route keys mapped to the maximum number of concurrent in-flight
    ///   requests allowed on that route. A later duplicate key replaces an earlier one.
    pub fn new<I, K>(limits: I) -> Self
    where
        I: IntoIterator<Item = (K, usize)>,
        K: Into<String>,
    {
        let routes = limits
            .into_iter()
            .map(|(route, max)| {
                (
                    route.into(),
                    RouteConcurrency {
                        max,
                        current: AtomicUsize::new(0),
                    },
                )
            })
            .collect();
        Self { routes }
    }

    /// The configured route keys, in no particular order.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Number of configured routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// `true` if no routes are configured, in which case every request is admitted.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<K> FromIterator<(K, usize)> for LocalLimiter
where
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, usize)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<K> From<HashMap<K, usize>> for LocalLimiter
where
    K: Into<String>,
{
    fn from(limits: HashMap<K, usize>) -> Self {
        Self::new(limits)
    }
}
