use axum::extract::{Path, State};
use axum::Json;
use servo_core::Pattern;

use crate::error::AppError;
use crate::extract::ApiJson;
use crate::routes::ack;
use crate::state::AppState;

/// POST /api/pattern — save (or overwrite) a pattern.
pub async fn save_pattern(
    State(app): State<AppState>,
    ApiJson(pattern): ApiJson<Pattern>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.patterns.save(pattern)?;
    Ok(ack())
}

/// GET /api/patterns — all saved patterns.
pub async fn list_patterns(
    State(app): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::to_value(app.patterns.list())?))
}

/// GET /api/pattern/{name}
pub async fn get_pattern(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pattern = app.patterns.get(&name)?;
    Ok(Json(serde_json::to_value(pattern)?))
}

/// POST /api/pattern/{name}/start — launch playback in the background.
pub async fn start_pattern(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let record = app.runner.start(&name).await?;
    Ok(Json(serde_json::json!({
        "status": "success",
        "run_id": record.id,
    })))
}

/// POST /api/pattern/{name}/stop — request cancellation; always acknowledged.
pub async fn stop_pattern(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Json<serde_json::Value> {
    app.runner.stop(&name).await;
    ack()
}
