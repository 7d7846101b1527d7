/// Category attached to every concurrency rejection.
pub const ERR_CATEGORY: &str = "concurrency-limit-exceeded";

/// Errors produced by the route limit middleware for a single request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteLimitError {
    /// The route already had `max` requests in flight.
    ///
    /// `current` includes the rejected request itself, so it is always greater than `max`.
    /// When the `axum` feature is enabled, this converts to `429 Too Many Requests`.
    #[error("too many request, current:{current}, max:{max}")]
    ConcurrencyExceeded {
        /// In-flight count observed by the rejected request.
        current: usize,
        /// The configured maximum for the route.
        max: usize,
    },
}

impl RouteLimitError {
    /// The error category, see [`ERR_CATEGORY`].
    pub fn category(&self) -> &'static str {
        ERR_CATEGORY
    }

    /// Numeric HTTP status equivalent of this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ConcurrencyExceeded { .. } => 429,
        }
    }

    /// HTTP status equivalent of this error.
    #[cfg(feature = "http")]
    pub fn http_status(&self) -> http::StatusCode {
        match self {
            Self::ConcurrencyExceeded { .. } => http::StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

/// Errors raised while wiring up the middleware.
///
/// These indicate a programming error and are not recoverable at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No limiter was supplied.
    #[error("require limiter")]
    MissingLimiter,

    /// No way of resolving a route key from a request was supplied.
    #[error("require route resolver")]
    MissingRoute,
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for RouteLimitError {
    fn into_response(self) -> axum::response::Response {
        (self.http_status(), self.to_string()).into_response()
    }
}
