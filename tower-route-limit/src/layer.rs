use std::fmt;
use std::sync::Arc;

use route_limit::Limiter;
use tower::Layer;

use crate::error::ConfigError;
use crate::service::RouteLimitService;

pub(crate) type RouteFn<Req> = Arc<dyn Fn(&Req) -> Option<String> + Send + Sync>;
pub(crate) type SkipFn<Req> = Arc<dyn Fn(&Req) -> bool + Send + Sync>;

/// Applies per-route concurrency limits to requests.
///
/// Every service produced by this layer, and every clone of those services, shares the
/// same limiter.
pub struct RouteLimitLayer<L, Req>
where
    L: ?Sized,
{
    limiter: Arc<L>,
    route: RouteFn<Req>,
    skip: Option<SkipFn<Req>>,
}

impl<L, Req> Clone for RouteLimitLayer<L, Req>
where
    L: ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            route: Arc::clone(&self.route),
            skip: self.skip.clone(),
        }
    }
}

impl<L, Req> fmt::Debug for RouteLimitLayer<L, Req>
where
    L: fmt::Debug + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteLimitLayer")
            .field("limiter", &self.limiter)
            .field("skip", &self.skip.is_some())
            .finish()
    }
}

impl<L, Req> RouteLimitLayer<L, Req>
where
    L: Limiter + ?Sized,
{
    /// Create a RouteLimitLayer
    ///
    /// `route` resolves the route key of a request. Returning `None` admits the request
    /// without counting it.
    pub fn new<F>(limiter: Arc<L>, route: F) -> Self
    where
        F: Fn(&Req) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            limiter,
            route: Arc::new(route),
            skip: None,
        }
    }

    /// Start building a layer. See [`RouteLimitLayerBuilder`].
    pub fn builder() -> RouteLimitLayerBuilder<L, Req> {
        RouteLimitLayerBuilder::new()
    }

    /// Set a predicate which bypasses limiting for matching requests.
    ///
    /// Skipped requests are forwarded untouched and never counted.
    pub fn with_skip<F>(mut self, skip: F) -> Self
    where
        F: Fn(&Req) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(skip));
        self
    }

    /// The limiter shared by every service built from this layer.
    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }
}

#[cfg(feature = "http")]
impl<L, B> RouteLimitLayer<L, http::Request<B>>
where
    L: Limiter + ?Sized,
    B: 'static,
{
    /// Create a RouteLimitLayer keyed by [`http_route_key`](crate::http_route_key).
    pub fn http(limiter: Arc<L>) -> Self {
        Self::new(limiter, crate::route::http_route_key)
    }
}

impl<L, S, Req> Layer<S> for RouteLimitLayer<L, Req>
where
    L: ?Sized,
{
    type Service = RouteLimitService<L, S, Req>;

    fn layer(&self, service: S) -> Self::Service {
        RouteLimitService::new(
            service,
            self.limiter.clone(),
            self.route.clone(),
            self.skip.clone(),
        )
    }
}

/// Builder for [`RouteLimitLayer`].
///
/// A limiter and a route resolver are both required. Leaving either out is a wiring bug,
/// reported by [`try_build`](RouteLimitLayerBuilder::try_build) and fatal in
/// [`build`](RouteLimitLayerBuilder::build).
pub struct RouteLimitLayerBuilder<L, Req>
where
    L: ?Sized,
{
    limiter: Option<Arc<L>>,
    route: Option<RouteFn<Req>>,
    skip: Option<SkipFn<Req>>,
}

impl<L, Req> Default for RouteLimitLayerBuilder<L, Req>
where
    L: ?Sized,
{
    fn default() -> Self {
        Self {
            limiter: None,
            route: None,
            skip: None,
        }
    }
}

impl<L, Req> fmt::Debug for RouteLimitLayerBuilder<L, Req>
where
    L: fmt::Debug + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteLimitLayerBuilder")
            .field("limiter", &self.limiter)
            .field("route", &self.route.is_some())
            .field("skip", &self.skip.is_some())
            .finish()
    }
}

impl<L, Req> RouteLimitLayerBuilder<L, Req>
where
    L: Limiter + ?Sized,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limiter.
    pub fn limiter(mut self, limiter: Arc<L>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Set how a route key is resolved from a request.
    pub fn route<F>(mut self, route: F) -> Self
    where
        F: Fn(&Req) -> Option<String> + Send + Sync + 'static,
    {
        self.route = Some(Arc::new(route));
        self
    }

    /// Set a predicate which bypasses limiting for matching requests.
    ///
    /// Defaults to never skipping.
    pub fn skip<F>(mut self, skip: F) -> Self
    where
        F: Fn(&Req) -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(skip));
        self
    }

    /// Build the layer, reporting missing configuration.
    pub fn try_build(self) -> Result<RouteLimitLayer<L, Req>, ConfigError> {
        let limiter = self.limiter.ok_or(ConfigError::MissingLimiter)?;
        let route = self.route.ok_or(ConfigError::MissingRoute)?;
        Ok(RouteLimitLayer {
            limiter,
            route,
            skip: self.skip,
        })
    }

    /// Build the layer.
    ///
    /// # Panics
    ///
    /// Panics if no limiter or no route resolver was configured.
    pub fn build(self) -> RouteLimitLayer<L, Req> {
        match self.try_build() {
            Ok(layer) => layer,
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(feature = "http")]
impl<L, B> RouteLimitLayerBuilder<L, http::Request<B>>
where
    L: Limiter + ?Sized,
    B: 'static,
{
    /// Resolve route keys with [`http_route_key`](crate::http_route_key).
    pub fn http_route(self) -> Self {
        self.route(crate::route::http_route_key)
    }
}
