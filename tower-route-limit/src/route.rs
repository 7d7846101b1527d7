//! Route key resolution for `http` requests.

/// Resolve the route key of an HTTP request as `"<METHOD> <path>"`.
///
/// With the `axum` feature, the matched route pattern (for example `/books/{id}`) is used
/// when the router has recorded one, so path parameters share a single limit. Otherwise the
/// raw URI path is used.
pub fn http_route_key<B>(req: &http::Request<B>) -> Option<String> {
    let path = matched_path(req).unwrap_or_else(|| req.uri().path());
    Some(format!("{} {}", req.method(), path))
}

#[cfg(feature = "axum")]
fn matched_path<B>(req: &http::Request<B>) -> Option<&str> {
    req.extensions()
        .get::<axum::extract::MatchedPath>()
        .map(|matched| matched.as_str())
}

#[cfg(not(feature = "axum"))]
fn matched_path<B>(_req: &http::Request<B>) -> Option<&str> {
    None
}
