use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use route_limit::LocalLimiter;
use serde_json::json;
use tower::BoxError;
use tower::ServiceBuilder;
use tower_route_limit::RouteLimitError;
use tower_route_limit::RouteLimitLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .init();

    // 1. Setup Limiter: at most 2 concurrent requests on GET /users/me
    let limiter = Arc::new(LocalLimiter::new([("GET /users/me", 2)]));

    // 2. Setup Layer: keyed by method and matched route, health checks are never limited
    let route_limit = RouteLimitLayer::<_, Request>::builder()
        .limiter(limiter)
        .http_route()
        .skip(|req: &Request| req.uri().path() == "/ping")
        .build();

    // 3. Build the Router
    let app = Router::new()
        .route("/users/me", get(users_me))
        .route("/ping", get(|| async { "pong" }))
        .route_layer(
            ServiceBuilder::new()
                // The outermost layer: catches BoxError and returns Response
                .layer(HandleErrorLayer::new(handle_route_limit_error))
                .layer(route_limit),
        );

    // 4. Serve
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
    tracing::info!("listening on http://127.0.0.1:3000");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn users_me() -> impl IntoResponse {
    // Hold the slot long enough for concurrent requests to pile up
    tokio::time::sleep(Duration::from_secs(1)).await;
    Json(json!({
        "account": "tree",
        "name": "tree.xie"
    }))
}

/// The signature must match BoxError -> IntoResponse
async fn handle_route_limit_error(err: BoxError) -> impl IntoResponse {
    if let Some(limit_err) = err.downcast_ref::<RouteLimitError>() {
        limit_err.clone().into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Service Error").into_response()
    }
}
