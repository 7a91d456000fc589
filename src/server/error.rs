use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Classified request failures. Every variant maps to a precise status
/// code; anything else is a logged 500 with a generic message.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad input shape or type; never partially applied.
    #[error("{0}")]
    Validation(String),
    /// The record exists but the caller does not own it, or credentials
    /// failed.
    #[error("Not authorized")]
    NotAuthorized,
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Syntactically invalid identifier, distinct from not-found.
    #[error("Invalid interview ID format")]
    MalformedId,
    #[error("Server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::MalformedId => StatusCode::BAD_REQUEST,
            ApiError::NotAuthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(cause) = &self {
            error!("Internal server error: {cause:#}");
        }
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
