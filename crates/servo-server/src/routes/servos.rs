use axum::extract::State;
use axum::Json;
use servo_core::ActuatorConfig;

use crate::error::AppError;
use crate::extract::{ApiJson, ChannelPath};
use crate::routes::ack;
use crate::state::AppState;

/// POST /api/servo/{channel} — configure a channel and seek its initial position.
pub async fn configure_servo(
    State(app): State<AppState>,
    ChannelPath(channel): ChannelPath,
    ApiJson(config): ApiJson<ActuatorConfig>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.registry.configure(channel, config)?;
    Ok(ack())
}

/// GET /api/servo/{channel} — config and last logical position.
pub async fn get_servo(
    State(app): State<AppState>,
    ChannelPath(channel): ChannelPath,
) -> Result<Json<serde_json::Value>, AppError> {
    let snapshot = app.registry.get(channel)?;
    Ok(Json(serde_json::to_value(snapshot)?))
}

#[derive(serde::Deserialize)]
pub struct MoveBody {
    pub angle: f64,
}

/// POST /api/servo/{channel}/position — move to a logical angle.
pub async fn move_servo(
    State(app): State<AppState>,
    ChannelPath(channel): ChannelPath,
    ApiJson(body): ApiJson<MoveBody>,
) -> Result<Json<serde_json::Value>, AppError> {
    app.registry.move_to(channel, body.angle)?;
    Ok(ack())
}
