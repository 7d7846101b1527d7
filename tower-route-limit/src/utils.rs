use std::sync::Arc;

use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::layer::util::Stack;
use tower::util::BoxCloneSyncService;

use route_limit::Limiter;

use crate::RouteLimitLayer;

/// Limit the concurrency of each route of `svc` and box the result
pub fn make_route_limit_svc<L, V, Req, Resp, F>(
    limiter: Arc<L>,
    route: F,
    svc: V,
) -> BoxCloneSyncService<Req, Resp, BoxError>
where
    L: Limiter + ?Sized + 'static,
    F: Fn(&Req) -> Option<String> + Send + Sync + 'static,
    Req: Send + 'static,
    V: Service<Req, Response = Resp, Error = BoxError> + Clone + Send + Sync + 'static,
    <V as Service<Req>>::Future: Send + 'static,
{
    BoxCloneSyncService::new(
        ServiceBuilder::new()
            .layer(RouteLimitLayer::new(limiter, route))
            .service(svc),
    )
}

/// Service Builder Extension with additional useful functions for tower::ServiceBuilder.
pub trait ServiceBuilderExt<S> {
    /// Add a per-route concurrency limit, resolving route keys with `route`
    fn route_limit<L, Req, F>(
        self,
        limiter: Arc<L>,
        route: F,
    ) -> ServiceBuilder<Stack<RouteLimitLayer<L, Req>, S>>
    where
        L: Limiter + ?Sized,
        F: Fn(&Req) -> Option<String> + Send + Sync + 'static;

    /// Add a per-route concurrency limit keyed by `"<METHOD> <path>"`
    #[cfg(feature = "http")]
    fn http_route_limit<L, B>(
        self,
        limiter: Arc<L>,
    ) -> ServiceBuilder<Stack<RouteLimitLayer<L, http::Request<B>>, S>>
    where
        L: Limiter + ?Sized,
        B: 'static;
}

impl<S> ServiceBuilderExt<S> for ServiceBuilder<S> {
    fn route_limit<L, Req, F>(
        self,
        limiter: Arc<L>,
        route: F,
    ) -> ServiceBuilder<Stack<RouteLimitLayer<L, Req>, S>>
    where
        L: Limiter + ?Sized,
        F: Fn(&Req) -> Option<String> + Send + Sync + 'static,
    {
        self.layer(RouteLimitLayer::new(limiter, route))
    }

    #[cfg(feature = "http")]
    fn http_route_limit<L, B>(
        self,
        limiter: Arc<L>,
    ) -> ServiceBuilder<Stack<RouteLimitLayer<L, http::Request<B>>, S>>
    where
        L: Limiter + ?Sized,
        B: 'static,
    {
        self.layer(RouteLimitLayer::http(limiter))
    }
}
