use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use servo_core::ServoError;

// ---------------------------------------------------------------------------
// AppError — unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
///
/// Body shape: `{"status": "error", "kind": "...", "message": "..."}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        let Some(e) = self.0.downcast_ref::<ServoError>() else {
            return (StatusCode::INTERNAL_SERVER_ERROR, "internal");
        };
        let status = match e {
            ServoError::InvalidChannel(_) | ServoError::Validation(_) => StatusCode::BAD_REQUEST,
            ServoError::NotConfigured(_) | ServoError::PatternNotFound(_) => StatusCode::NOT_FOUND,
            ServoError::OutOfLimits { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ServoError::AlreadyRunning(_) => StatusCode::CONFLICT,
            ServoError::Driver(_) => StatusCode::BAD_GATEWAY,
            ServoError::Io(_) | ServoError::Yaml(_) | ServoError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, e.kind())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let body = serde_json::json!({
            "status": "error",
            "kind": kind,
            "message": self.0.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servo_core::driver::DriverError;

    fn status_of(err: ServoError) -> StatusCode {
        AppError(err.into()).into_response().status()
    }

    #[test]
    fn invalid_channel_maps_to_400() {
        assert_eq!(
            status_of(ServoError::InvalidChannel("16".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn validation_maps_to_400() {
        assert_eq!(
            status_of(ServoError::Validation("pattern name is required".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_configured_maps_to_404() {
        assert_eq!(status_of(ServoError::NotConfigured(7)), StatusCode::NOT_FOUND);
    }

    #[test]
    fn pattern_not_found_maps_to_404() {
        assert_eq!(
            status_of(ServoError::PatternNotFound("wave".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn out_of_limits_maps_to_422() {
        assert_eq!(
            status_of(ServoError::OutOfLimits {
                channel: 0,
                angle: 5.0,
                min: 10.0,
                max: 170.0
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn already_running_maps_to_409() {
        assert_eq!(
            status_of(ServoError::AlreadyRunning("wave".into())),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn driver_error_maps_to_502() {
        let err = DriverError {
            channel: 2,
            message: "controller not responding".into(),
        };
        assert_eq!(status_of(err.into()), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn non_servo_error_maps_to_500() {
        let err = AppError(anyhow::anyhow!("something unexpected"));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_body_is_json() {
        let response = AppError(ServoError::NotConfigured(3).into()).into_response();
        let ct = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .expect("should have content-type");
        assert!(ct.to_str().unwrap().contains("application/json"));
    }
}
