//! Extractors whose rejections use the API error body instead of axum's
//! plain-text defaults.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;
use servo_core::{Channel, ServoError};

use crate::error::AppError;

/// JSON request body. Malformed or mistyped bodies become `validation_error`.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(body_rejection(rejection)),
        }
    }
}

fn body_rejection(rejection: JsonRejection) -> AppError {
    ServoError::Validation(rejection.body_text()).into()
}

/// The `{channel}` path segment. Anything that is not an integer in 0..=15
/// becomes `invalid_channel`.
pub struct ChannelPath(pub Channel);

impl<S> FromRequestParts<S> for ChannelPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::from(ServoError::Validation(e.body_text())))?;
        Ok(ChannelPath(raw.parse()?))
    }
}
