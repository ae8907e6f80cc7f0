use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use reserva_core::CoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    Core(CoreError),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, reason) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Core(err) => {
                let reason = err.deny_reason();
                let status = match &err {
                    CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    CoreError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
                    CoreError::Conflict => StatusCode::CONFLICT,
                    CoreError::Unavailable(_) => StatusCode::BAD_REQUEST,
                    CoreError::Validation(_) => StatusCode::BAD_REQUEST,
                    CoreError::Forbidden => StatusCode::FORBIDDEN,
                    CoreError::Store(msg) => {
                        tracing::error!("Internal Server Error: {}", msg);
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "Internal Server Error" })),
                        )
                            .into_response();
                    }
                };
                (status, err.to_string(), reason)
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        };

        let body = match reason {
            Some(reason) => Json(json!({
                "error": error_message,
                "reason": reason.as_str(),
            })),
            None => Json(json!({
                "error": error_message,
            })),
        };

        (status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reserva_core::DenyReason;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(AppError::Core(CoreError::NotFound("booking".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Conflict)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Unavailable(
                DenyReason::ResourceBlocked
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Unavailable(
                DenyReason::BlackoutDate
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::InvalidTransition {
                from: "approved".into(),
                to: "approved".into(),
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Forbidden)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Validation("bad".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(AppError::Core(CoreError::Store("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(AppError::AuthenticationError("expired".into())),
            StatusCode::UNAUTHORIZED
        );
    }
}
