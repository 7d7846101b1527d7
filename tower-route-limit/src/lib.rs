//! # Tower Route Limit
//!
//! `tower-route-limit` caps how many requests may be in flight at once for each route of a
//! [Tower](https://github.com/tower-rs/tower) service, rejecting the excess instead of
//! queueing it.
//!
//! ## How it works
//! For every request, [`RouteLimitService`]:
//!
//! 1. **Skips** the request entirely if the configured skip predicate matches it.
//! 2. **Resolves** a route key (for example `"GET /users/me"`) and increments that route's
//!    in-flight count on the shared [`route_limit::Limiter`].
//! 3. **Rejects** the request with [`RouteLimitError::ConcurrencyExceeded`] when the count
//!    is above the route's maximum, or forwards it to the inner service otherwise.
//! 4. **Releases** the count through a [`ConcurrencyPermit`] when the response completes,
//!    fails, panics or is dropped.
//!
//! Routes the limiter does not know about are always admitted and never counted.
//!
//! ## Feature Flags
//!
//! - `http`: Enables [`http_route_key`] and [`RouteLimitLayer::http`], keying requests by
//!   method and path.
//! - `axum`: Enables `IntoResponse` for [`RouteLimitError`] (429 Too Many Requests) and keys
//!   requests by axum's matched route pattern when available.

mod error;
mod layer;
mod permit;
#[cfg(feature = "http")]
mod route;
mod service;
mod utils;


pub use error::ConfigError;
pub use error::ERR_CATEGORY;
pub use error::RouteLimitError;
pub use layer::RouteLimitLayer;
pub use layer::RouteLimitLayerBuilder;
pub use permit::ConcurrencyPermit;
#[cfg(feature = "http")]
pub use route::http_route_key;
pub use service::ResponseFuture;
pub use service::RouteLimitService;
pub use utils::ServiceBuilderExt;
pub use utils::make_route_limit_svc;
