use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use akademi_core::AppError;

/// Map a domain error onto the wire: status code + `{error, message}` body.
pub fn error_response(err: AppError) -> axum::response::Response {
    match err {
        AppError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AppError::Unauthorized(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
        AppError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        AppError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        AppError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        AppError::Internal(msg) => {
            tracing::error!(error = %msg, "internal error");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
