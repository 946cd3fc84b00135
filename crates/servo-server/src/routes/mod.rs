pub mod events;
pub mod patterns;
pub mod servos;
pub mod status;

use axum::Json;

/// `{"status": "success"}` acknowledgement body.
pub(crate) fn ack() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "success" }))
}
