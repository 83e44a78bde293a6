use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::{pages, AppState};
use crate::services::export_service;
use crate::utils::ExportError;

/// Query string of the OAuth redirect
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status = self.status();
        error!("Export failed ({}): {}", status, self);
        (status, Html(pages::error_page(&self))).into_response()
    }
}

/// GET /
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    debug!("Serving index page");
    Html(pages::index_page(&state.auth_url))
}

/// GET /getTransactions/?code=...&state=...
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, ExportError> {
    if let Some(error) = params.error {
        let detail = params.error_description.unwrap_or(error);
        return Err(ExportError::AuthorizationDenied(detail));
    }

    let returned_state = params.state.unwrap_or_default();
    if !state.state_token.matches(&returned_state) {
        warn!("Rejecting OAuth callback with unexpected state");
        return Err(ExportError::StateMismatch);
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or(ExportError::MissingCode)?;

    let result = export_service::export_transactions(&state.client, &code, &state.output_dir).await?;
    info!("Export ready at /files/{}", result.file_name);
    Ok(Html(pages::exported_page(&result)))
}

/// GET /files/{name}
pub async fn download(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    if !is_export_file_name(&name) {
        return (StatusCode::BAD_REQUEST, "Invalid file name").into_response();
    }

    let path = state.output_dir.join(&name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (CONTENT_TYPE, "application/x-ofx".to_string()),
                (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", name)),
            ],
            bytes,
        )
            .into_response(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(e) => {
            error!("Failed to read {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file").into_response()
        }
    }
}

/// Only plain `*.ofx` names directly inside the output directory
fn is_export_file_name(name: &str) -> bool {
    !name.is_empty()
        && name.ends_with(".ofx")
        && !name.contains("..")
        && !name.contains(['/', '\\', '"'])
}
