use axum::extract::State;
use axum::Json;

use crate::state::AppState;

/// GET /api/status — channels, running patterns, recent runs and host metrics.
pub async fn get_status(State(app): State<AppState>) -> Json<serde_json::Value> {
    let channels = app.registry.snapshot();
    let running = app.runner.running().await;
    let recent_runs = app.runner.history().await;
    let system = app.metrics.sample();

    Json(serde_json::json!({
        "status": "running",
        "channels": channels,
        "running_patterns": running,
        "recent_runs": recent_runs,
        "system": system,
    }))
}
