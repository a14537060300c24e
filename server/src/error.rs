use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Prefix of the alert headers sent to clients (`X-promsApp-alert`).
pub const APPLICATION_NAME: &str = "promsApp";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: i64, reason: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error body returned to clients, modelled on the alert format the web
/// client understands.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub title: String,
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_key: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    BadRequestAlert {
        message: String,
        entity_name: String,
        error_key: String,
    },
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(
        message: impl Into<String>,
        entity_name: impl Into<String>,
        error_key: impl Into<String>,
    ) -> Self {
        ApiError::BadRequestAlert {
            message: message.into(),
            entity_name: entity_name.into(),
            error_key: error_key.into(),
        }
    }

    pub fn not_found(entity_name: &str, id: impl std::fmt::Display) -> Self {
        ApiError::NotFound(format!("{} with id {} not found", entity_name, id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequestAlert { .. } | ApiError::InvalidCriteria(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut headers = HeaderMap::new();

        let body = match self {
            ApiError::BadRequestAlert {
                message,
                entity_name,
                error_key,
            } => {
                insert_header(
                    &mut headers,
                    &format!("X-{}-error", APPLICATION_NAME),
                    &format!("error.{}", error_key),
                );
                insert_header(
                    &mut headers,
                    &format!("X-{}-params", APPLICATION_NAME),
                    &entity_name,
                );
                ErrorBody {
                    title: message,
                    status: status.as_u16(),
                    message: format!("error.{}", error_key),
                    entity_name: Some(entity_name),
                    error_key: Some(error_key),
                }
            }
            ApiError::InvalidCriteria(detail) => ErrorBody {
                title: detail,
                status: status.as_u16(),
                message: "error.invalidcriteria".to_string(),
                entity_name: None,
                error_key: Some("invalidcriteria".to_string()),
            },
            ApiError::NotFound(detail) => ErrorBody {
                title: detail,
                status: status.as_u16(),
                message: "error.http.404".to_string(),
                entity_name: None,
                error_key: None,
            },
            ApiError::Internal(detail) => {
                tracing::error!(detail, "internal server error");
                ErrorBody {
                    title: "An internal error occurred".to_string(),
                    status: status.as_u16(),
                    message: "error.http.500".to_string(),
                    entity_name: None,
                    error_key: None,
                }
            }
        };

        (status, headers, Json(body)).into_response()
    }
}

pub(crate) fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (
        axum::http::HeaderName::try_from(name),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, value);
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(rejection.body_text(), "request", "invalidpayload")
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text(), "request", "invalidpath")
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlx(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return ApiError::NotFound("Entity not found".to_string());
        }
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return ApiError::bad_request(
                    "An entity with the same unique value already exists",
                    "entity",
                    "duplicate",
                );
            }
            if db_err.is_foreign_key_violation() {
                return ApiError::bad_request(
                    "A referenced entity does not exist",
                    "entity",
                    "invalidreference",
                );
            }
        }
        ApiError::Internal(err.to_string())
    }
}
