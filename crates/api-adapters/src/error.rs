//! # ApiError
//!
//! HTTP-facing error type. Every handler returns `Result<_, ApiError>`; the
//! JSON body is always `{ "error": <message>, "status": <code> }`.

use domains::errors::AppError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("missing or unknown identity")]
    Unauthorized,

    /// The path, query string or body could not be read.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::App(AppError::NotFound(..)) => 404,
            ApiError::App(AppError::ValidationError(_)) => 422,
            ApiError::App(AppError::Forbidden(_)) => 403,
            ApiError::App(AppError::Storage { .. }) | ApiError::Internal(_) => 500,
            ApiError::Unauthorized => 401,
            ApiError::Rejected { status, .. } => *status,
        }
    }

    /// The message sent to clients. Server-side failures are not echoed back.
    pub fn public_message(&self) -> String {
        match self.status_code() {
            500 => "internal server error".to_owned(),
            _ => self.to_string(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(feature = "web-axum")]
mod axum_impls {
    use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;
    use serde_json::json;

    use super::ApiError;

    fn rejected(status: StatusCode, message: String) -> ApiError {
        ApiError::Rejected {
            status: status.as_u16(),
            message,
        }
    }

    impl From<JsonRejection> for ApiError {
        fn from(rejection: JsonRejection) -> Self {
            rejected(rejection.status(), rejection.body_text())
        }
    }

    impl From<PathRejection> for ApiError {
        fn from(rejection: PathRejection) -> Self {
            rejected(rejection.status(), rejection.body_text())
        }
    }

    impl From<QueryRejection> for ApiError {
        fn from(rejection: QueryRejection) -> Self {
            rejected(rejection.status(), rejection.body_text())
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            let status = StatusCode::from_u16(self.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                tracing::error!(error = %self, "request failed");
            }

            let body = Json(json!({
                "error": self.public_message(),
                "status": status.as_u16()
            }));

            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_failures_are_masked() {
        let err = ApiError::from(AppError::Storage {
            operation: "fetch posts",
            source: anyhow::anyhow!("database is locked"),
        });
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), "internal server error");
    }

    #[test]
    fn domain_errors_keep_their_message() {
        let err = ApiError::from(AppError::not_found("Thought", "abc"));
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.public_message(), "Thought not found with ID abc");

        let err = ApiError::from(AppError::Forbidden("not the author".into()));
        assert_eq!(err.status_code(), 403);
        assert_eq!(ApiError::Unauthorized.status_code(), 401);
    }

    #[test]
    fn unreadable_requests_keep_the_extractor_status() {
        let err = ApiError::Rejected {
            status: 400,
            message: "Invalid URL: UUID parsing failed".into(),
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.public_message(), "Invalid URL: UUID parsing failed");
    }
}
