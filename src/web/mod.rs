pub mod handlers;
pub mod pages;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use reqwest::Url;

use crate::api::monzo::MonzoClient;
use crate::utils::StateToken;

pub const LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const INDEX_URL: &str = "http://localhost:8080/";
pub const DEFAULT_AUTH_URL: &str = "https://auth.monzo.com/";

/// Shared, read-only state for every request
pub struct AppState {
    pub client: MonzoClient,
    pub state_token: StateToken,
    pub output_dir: PathBuf,
    pub auth_url: String,
}

impl AppState {
    pub fn new(
        client: MonzoClient,
        state_token: StateToken,
        output_dir: PathBuf,
        auth_base_url: &str,
    ) -> Result<Self, String> {
        let auth_url = authorization_url(auth_base_url, &client, &state_token)?;
        Ok(Self {
            client,
            state_token,
            output_dir,
            auth_url,
        })
    }
}

/// Link the user follows to grant access
pub fn authorization_url(
    auth_base_url: &str,
    client: &MonzoClient,
    state_token: &StateToken,
) -> Result<String, String> {
    Url::parse_with_params(
        auth_base_url,
        &[
            ("client_id", client.settings().client_id.as_str()),
            ("redirect_uri", client.redirect_uri()),
            ("response_type", "code"),
            ("state", state_token.as_str()),
        ],
    )
    .map(String::from)
    .map_err(|e| format!("Invalid authorization URL {}: {}", auth_base_url, e))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/getTransactions/", get(handlers::get_transactions))
        .route("/files/:name", get(handlers::download))
        .with_state(state)
}
