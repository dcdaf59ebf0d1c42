//! API errors
//! Mission: Map every failure to a status code and a `{"detail": ...}` body

use crate::auth::models::AuthError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Auth(AuthError),
    Store(StoreError),
    Forbidden(&'static str),
    NotFound(&'static str),
    Validation(String),
    Internal(anyhow::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Auth(err) => err.into_response(),
            ApiError::Store(StoreError::NotFound(what)) => {
                detail(StatusCode::NOT_FOUND, format!("{} not found", what))
            }
            ApiError::Store(StoreError::Database(e)) => {
                error!(error = %e, "Database error");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
            }
            ApiError::Store(err) => detail(StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Forbidden(message) => detail(StatusCode::FORBIDDEN, message),
            ApiError::NotFound(what) => {
                detail(StatusCode::NOT_FOUND, format!("{} not found", what))
            }
            ApiError::Validation(message) => detail(StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Internal(e) => {
                error!(error = %e, "Internal error");
                detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}
