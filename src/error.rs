use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Short URL not found")]
    LinkNotFound,

    #[error("This link has expired")]
    LinkExpired,

    #[error("Please enter a valid URL")]
    InvalidTargetUrl,

    #[error("Please enter a valid expiration date")]
    InvalidExpirationDate,

    #[error("Expiration date cannot be in the past")]
    ExpirationInPast,

    #[error("Slug is already in use")]
    SlugTaken,

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire shape of every non-2xx response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    /// True when the underlying database error is a unique constraint
    /// violation, e.g. two inserts racing for the same slug.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::LinkNotFound => StatusCode::NOT_FOUND,
            Error::LinkExpired => StatusCode::GONE,
            Error::InvalidTargetUrl | Error::InvalidExpirationDate | Error::ExpirationInPast => {
                StatusCode::BAD_REQUEST
            }
            Error::SlugTaken => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Store and config failures carry internal detail; log it here
        // and hand the client a fixed message.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal error: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_error_display_link_not_found() {
        let err = Error::LinkNotFound;
        assert_eq!(err.to_string(), "Short URL not found");
    }

    #[test]
    fn test_error_display_link_expired() {
        let err = Error::LinkExpired;
        assert_eq!(err.to_string(), "This link has expired");
    }

    #[test]
    fn test_error_display_invalid_target_url() {
        let err = Error::InvalidTargetUrl;
        assert_eq!(err.to_string(), "Please enter a valid URL");
    }

    #[test]
    fn test_error_display_invalid_expiration_date() {
        let err = Error::InvalidExpirationDate;
        assert_eq!(err.to_string(), "Please enter a valid expiration date");
    }

    #[test]
    fn test_error_display_expiration_in_past() {
        let err = Error::ExpirationInPast;
        assert_eq!(err.to_string(), "Expiration date cannot be in the past");
    }

    #[test]
    fn test_error_display_slug_taken() {
        let err = Error::SlugTaken;
        assert_eq!(err.to_string(), "Slug is already in use");
    }

    #[tokio::test]
    async fn test_error_into_response_not_found() {
        let err = Error::LinkNotFound;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_error_into_response_gone() {
        let err = Error::LinkExpired;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn test_error_into_response_bad_request_target() {
        let err = Error::InvalidTargetUrl;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_error_into_response_bad_request_date() {
        let err = Error::InvalidExpirationDate;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_error_into_response_bad_request_past_date() {
        let err = Error::ExpirationInPast;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_error_into_response_conflict() {
        let err = Error::SlugTaken;
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_error_into_response_internal() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_sqlx_error() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_is_unique_violation_false_for_other_errors() {
        assert!(!Error::SlugTaken.is_unique_violation());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_unique_violation());
    }
}
