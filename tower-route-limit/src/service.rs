use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tower::BoxError;
use tower::Service;

use route_limit::Limiter;

use crate::error::RouteLimitError;
use crate::layer::RouteFn;
use crate::layer::SkipFn;
use crate::permit::ConcurrencyPermit;

#[derive(Clone, Debug)]
struct RouteLimitServiceMetrics {
    admitted: Counter<u64>,
    rejected: Counter<u64>,
    skipped: Counter<u64>,
}

impl RouteLimitServiceMetrics {
    fn new() -> Self {
        let meter = global::meter("route_limit_service");
        Self {
            admitted: meter.u64_counter("admitted").build(),
            rejected: meter.u64_counter("rejected").build(),
            skipped: meter.u64_counter("skipped").build(),
        }
    }
}

/// Enforces per-route concurrency limits on an inner service.
///
/// Requests over their route's limit are rejected immediately with
/// [`RouteLimitError::ConcurrencyExceeded`]. They are never queued.
pub struct RouteLimitService<L, S, Req>
where
    L: ?Sized,
{
    inner: S,
    limiter: Arc<L>,
    route: RouteFn<Req>,
    skip: Option<SkipFn<Req>>,
    instruments: RouteLimitServiceMetrics,
}

pin_project! {
    /// Response future for [`RouteLimitService`].
    ///
    /// Holds the request's permit, if any, until the inner future completes or this
    /// future is dropped.
    pub struct ResponseFuture<F, P> {
        #[pin]
        kind: Kind<F>,
        permit: Option<P>,
    }
}

pin_project! {
    #[project = KindProj]
    enum Kind<F> {
        Called {
            #[pin]
            future: F,
        },
        Rejected {
            error: Option<RouteLimitError>,
        },
    }
}

impl<F, P> ResponseFuture<F, P> {
    fn called(future: F, permit: Option<P>) -> Self {
        Self {
            kind: Kind::Called { future },
            permit,
        }
    }

    fn rejected(error: RouteLimitError) -> Self {
        Self {
            kind: Kind::Rejected { error: Some(error) },
            permit: None,
        }
    }
}

impl<F, P, T, E> Future for ResponseFuture<F, P>
where
    F: Future<Output = Result<T, E>>,
    E: Into<BoxError>,
{
    type Output = Result<T, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.kind.project() {
            KindProj::Called { future } => {
                let res = std::task::ready!(future.poll(cx));
                // Release as soon as the response is ready
                drop(this.permit.take());
                Poll::Ready(res.map_err(Into::into))
            }
            KindProj::Rejected { error } => match error.take() {
                Some(err) => Poll::Ready(Err(BoxError::from(err))),
                None => panic!("ResponseFuture polled after completion"),
            },
        }
    }
}

impl<F, P> fmt::Debug for ResponseFuture<F, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("permit", &self.permit.is_some())
            .finish()
    }
}

impl<L, S, Req> Clone for RouteLimitService<L, S, Req>
where
    L: ?Sized,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
            route: Arc::clone(&self.route),
            skip: self.skip.clone(),
            instruments: self.instruments.clone(),
        }
    }
}

impl<L, S, Req> fmt::Debug for RouteLimitService<L, S, Req>
where
    L: fmt::Debug + ?Sized,
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteLimitService")
            .field("inner", &self.inner)
            .field("limiter", &self.limiter)
            .field("skip", &self.skip.is_some())
            .finish()
    }
}

impl<L, S, Req> Service<Req> for RouteLimitService<L, S, Req>
where
    L: Limiter + ?Sized,
    S: Service<Req>,
    S::Error: Into<BoxError>,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = ResponseFuture<S::Future, ConcurrencyPermit<L>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        if let Some(skip) = &self.skip
            && skip(&req)
        {
            tracing::trace!("route limit skipped");
            self.instruments.skipped.add(1, &[]);
            return ResponseFuture::called(self.inner.call(req), None);
        }

        let Some(route) = (self.route)(&req) else {
            tracing::trace!("no route key, request admitted");
            return ResponseFuture::called(self.inner.call(req), None);
        };

        let permit = ConcurrencyPermit::acquire(Arc::clone(&self.limiter), route);
        let concurrency = permit.concurrency();

        if !concurrency.is_tracked() {
            tracing::trace!(route = permit.route(), "untracked route admitted");
            return ResponseFuture::called(self.inner.call(req), Some(permit));
        }

        let attributes = [KeyValue::new("route", permit.route().to_string())];

        if concurrency.is_exceeded() {
            tracing::warn!(
                route = permit.route(),
                current = concurrency.current,
                max = concurrency.max,
                "concurrency limit exceeded"
            );
            self.instruments.rejected.add(1, &attributes);
            // Rejected requests give their slot back straight away
            drop(permit);
            return ResponseFuture::rejected(RouteLimitError::ConcurrencyExceeded {
                current: concurrency.current,
                max: concurrency.max,
            });
        }

        tracing::debug!(
            route = permit.route(),
            current = concurrency.current,
            max = concurrency.max,
            "request admitted"
        );
        self.instruments.admitted.add(1, &attributes);
        ResponseFuture::called(self.inner.call(req), Some(permit))
    }
}

impl<L, S, Req> RouteLimitService<L, S, Req>
where
    L: ?Sized,
{
    pub(crate) fn new(
        inner: S,
        limiter: Arc<L>,
        route: RouteFn<Req>,
        skip: Option<SkipFn<Req>>,
    ) -> Self {
        Self {
            inner,
            limiter,
            route,
            skip,
            instruments: RouteLimitServiceMetrics::new(),
        }
    }

    /// The limiter shared with every clone of this service.
    pub fn limiter(&self) -> &Arc<L> {
        &self.limiter
    }

    /// Get a reference to the inner service
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner service
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume `self`, returning the inner service
    pub fn into_inner(self) -> S {
        self.inner
    }
}
