use axum::{
    Json,
    extract::rejection::{FormRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use quill_types::api::ErrorBody;

pub type ApiResult<T> = Result<T, ApiError>;

/// Every failure a handler can report. All of them render the same
/// `{ "error", "message" }` JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized entry")]
    Unauthenticated,

    #[error("Invalid login information")]
    InvalidCredentials,

    #[error("Username already taken")]
    UsernameTaken,

    #[error("Please choose a file with jpeg or png extension")]
    UnsupportedMediaType,

    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::UsernameTaken => StatusCode::CONFLICT,
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::UsernameTaken => "username_taken",
            ApiError::UnsupportedMediaType => "unsupported_media_type",
            ApiError::PayloadTooLarge => "payload_too_large",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Internal(_) => "server_error",
        }
    }
}

// Extractor rejections go through `WithRejection` so that malformed forms and
// query strings answer with the same JSON body as every other failure.
impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Server error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: self.code().to_string(),
            message,
        };

        (self.status(), Json(body)).into_response()
    }
}
