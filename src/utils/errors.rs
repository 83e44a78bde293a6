use std::path::PathBuf;

use axum::http::StatusCode;
use thiserror::Error;

use crate::api::monzo::ApiError;
use crate::services::ofx_service::OfxError;

/// Everything that can fail one export request.
///
/// None of these stop the server; each maps to an HTTP status for the browser.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Authentication failed: {0}")]
    Unauthorized(String),
    #[error("Monzo API error: {0}")]
    Api(ApiError),
    #[error("No accounts returned for user {0}")]
    NoAccounts(String),
    #[error("Authorization was not granted: {0}")]
    AuthorizationDenied(String),
    #[error("Missing authorization code")]
    MissingCode,
    #[error("OAuth state did not match; start again from the home page")]
    StateMismatch,
    #[error("Failed to render OFX: {0}")]
    Ofx(#[from] OfxError),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ApiError> for ExportError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(msg) => ExportError::Unauthorized(msg),
            other => ExportError::Api(other),
        }
    }
}

impl ExportError {
    pub fn status(&self) -> StatusCode {
        match self {
            ExportError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ExportError::Api(_) | ExportError::NoAccounts(_) => StatusCode::BAD_GATEWAY,
            ExportError::AuthorizationDenied(_)
            | ExportError::MissingCode
            | ExportError::StateMismatch => StatusCode::BAD_REQUEST,
            ExportError::Ofx(_) | ExportError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
