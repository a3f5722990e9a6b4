use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledger::error::{ErrorKind, LedgerError};
use thiserror::Error;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Handler-level error: either a typed engine failure or a request the
/// handler itself rejected before reaching the engine.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(err: sea_orm::DbErr) -> Self {
        ApiError::Ledger(LedgerError::Unavailable(err))
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::PolicyViolation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::InvalidState => StatusCode::CONFLICT,
                ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Ledger(e) => e.code(),
            ApiError::BadRequest(_) => "INVALID_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Infrastructure faults get logged with enough context to reconcile
        // manually; the engine spans carry the ids and amounts involved.
        if matches!(&self, ApiError::Ledger(e) if e.kind() == ErrorKind::Unavailable) {
            error!(error = %self, "ledger commit failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            success: false,
        };
        (self.status(), Json(body)).into_response()
    }
}
