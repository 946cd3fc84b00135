pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the axum Router with all API routes and middleware.
/// Used by `serve_on()` and available for integration testing.
pub fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Events (SSE)
        .route("/api/events", get(routes::events::sse_events))
        // Status
        .route("/api/status", get(routes::status::get_status))
        // Servos
        .route(
            "/api/servo/{channel}",
            post(routes::servos::configure_servo).get(routes::servos::get_servo),
        )
        .route(
            "/api/servo/{channel}/position",
            post(routes::servos::move_servo),
        )
        // Patterns
        .route("/api/pattern", post(routes::patterns::save_pattern))
        .route("/api/patterns", get(routes::patterns::list_patterns))
        .route("/api/pattern/{name}", get(routes::patterns::get_pattern))
        .route(
            "/api/pattern/{name}/start",
            post(routes::patterns::start_pattern),
        )
        .route(
            "/api/pattern/{name}/stop",
            post(routes::patterns::stop_pattern),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

/// Serve the API on a pre-bound listener until `shutdown` resolves.
///
/// Accepting a bound `TcpListener` lets the caller read the actual port
/// before starting (useful when `port = 0` and the OS picks a free port).
/// Running patterns are stopped once the server has drained.
pub async fn serve_on(
    app_state: AppState,
    listener: tokio::net::TcpListener,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let runner = app_state.runner.clone();
    let app = build_router(app_state);

    tracing::info!("servo API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    let stopped = runner.stop_all().await;
    tracing::info!(stopped, "server shut down");
    Ok(())
}
