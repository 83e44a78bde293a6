use reqwest::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, RETRY_AFTER};
use serde::de::DeserializeOwned;
use super::models::{AccessToken, Account, AccountList, ApiError, ErrorResponse, TokenRequest};
use crate::models::{TransactionList, TransactionRecord};
use crate::settings::Settings;
use tracing::{debug, warn};

/// Monzo API client for the OAuth exchange and the read-only endpoints we need
#[derive(Clone)]
pub struct MonzoClient {
    http_client: HttpClient,
    settings: Settings,
    base_url: String,
    redirect_uri: String,
}

impl MonzoClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.monzo.com";
    pub const DEFAULT_REDIRECT_URI: &'static str = "http://localhost:8080/getTransactions/";

    /// Create a new Monzo API client
    pub fn new(settings: Settings) -> Self {
        Self::with_base_url(settings, Self::DEFAULT_BASE_URL.to_string())
    }

    /// Create a new client with custom base URL (for testing)
    pub fn with_base_url(settings: Settings, base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            settings,
            base_url: base_url.trim_end_matches('/').to_string(),
            redirect_uri: Self::DEFAULT_REDIRECT_URI.to_string(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Create default headers with authorization
    fn create_headers(access_token: &str) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|e| ApiError::RequestError(format!("Failed to create auth header: {}", e)))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    /// Parse error response based on HTTP status code
    async fn handle_error_response(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> ApiError {
        let status_code = status.as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let body_text = response.text().await.unwrap_or_default();

        match status_code {
            400 => {
                // Try to parse JSON error
                let message = serde_json::from_str::<ErrorResponse>(&body_text)
                    .ok()
                    .and_then(|e| e.message)
                    .unwrap_or(body_text);
                ApiError::BadRequest(message)
            }
            401 => ApiError::Unauthorized(body_text),
            403 => ApiError::Forbidden(body_text),
            404 => ApiError::NotFound(body_text),
            429 => {
                let retry_after = retry_after.unwrap_or(1);
                warn!("Rate limited, retry after {} s", retry_after);
                ApiError::RateLimited { retry_after }
            }
            500..=599 => {
                warn!("Server error {}: {}", status_code, body_text);
                ApiError::ServerError(status_code, body_text)
            }
            _ => ApiError::HttpError(status_code, body_text),
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }

    /// POST /oauth2/token
    ///
    /// Exchanges a one-time authorization code for an access token. A reused
    /// or expired code comes back as `ApiError::Unauthorized`.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken, ApiError> {
        let url = format!("{}/oauth2/token", self.base_url);
        debug!("Fetching {}", url);

        let body = TokenRequest {
            grant_type: "authorization_code",
            client_id: &self.settings.client_id,
            client_secret: &self.settings.client_secret,
            redirect_uri: &self.redirect_uri,
            code,
        };

        let response = self.http_client
            .post(&url)
            .form(&body)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        Self::decode(response).await
    }

    /// GET /accounts
    ///
    /// Returns the accounts visible to the token, in API order.
    pub async fn list_accounts(
        &self,
        access_token: &str,
        user_id: &str,
    ) -> Result<Vec<Account>, ApiError> {
        let url = format!("{}/accounts", self.base_url);
        debug!("Fetching {} for user {}", url, user_id);
        let headers = Self::create_headers(access_token)?;

        let response = self.http_client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        Ok(Self::decode::<AccountList>(response).await?.accounts)
    }

    /// GET /transactions?account_id={account_id}
    ///
    /// Returns the account's transactions in API order. No pagination.
    pub async fn list_transactions(
        &self,
        access_token: &str,
        account_id: &str,
    ) -> Result<Vec<TransactionRecord>, ApiError> {
        let url = format!("{}/transactions", self.base_url);
        debug!("Fetching {} for account {}", url, account_id);
        let headers = Self::create_headers(access_token)?;

        let response = self.http_client
            .get(&url)
            .headers(headers)
            .query(&[("account_id", account_id)])
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        Ok(Self::decode::<TransactionList>(response).await?.transactions)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::extract::{Form, Query};
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    pub(crate) const ACCOUNT_ID: &str = "acc_000097rJJuKs0XcJLnVzTW";
    /// Account the mock knows but has no transactions for
    pub(crate) const EMPTY_ACCOUNT_ID: &str = "acc_00009Empty";

    fn authorized(headers: &AxumHeaders) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Bearer access_token")
    }

    /// In-process stand-in for the Monzo API
    pub(crate) fn mock_router() -> Router {
        mock_router_with_accounts(json!([{
            "id": ACCOUNT_ID,
            "created": "2016-05-04T13:50:41.289Z",
            "description": "Sam Martin"
        }]))
    }

    pub(crate) fn mock_router_with_accounts(accounts: Value) -> Router {
        Router::new()
            .route(
                "/oauth2/token",
                post(|Form(form): Form<HashMap<String, String>>| async move {
                    let valid = form.get("code").map(String::as_str) == Some("valid")
                        && form.get("grant_type").map(String::as_str) == Some("authorization_code")
                        && form.get("client_secret").map(String::as_str) == Some("client_secret");
                    if !valid {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({
                        "access_token": "access_token",
                        "client_id": "client_id",
                        "expires_in": 21600,
                        "refresh_token": "refresh_token",
                        "token_type": "Bearer",
                        "user_id": "user_id"
                    })))
                }),
            )
            .route(
                "/accounts",
                get(move |headers: AxumHeaders| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({ "accounts": accounts })))
                }),
            )
            .route(
                "/transactions",
                get(
                    |headers: AxumHeaders, Query(query): Query<HashMap<String, String>>| async move {
                        if !authorized(&headers) {
                            return Err(StatusCode::UNAUTHORIZED);
                        }
                        match query.get("account_id").map(String::as_str) {
                            Some(ACCOUNT_ID) => Ok(Json(transactions_body())),
                            Some(EMPTY_ACCOUNT_ID) => Ok(Json(json!({"transactions": []}))),
                            _ => Err(StatusCode::NOT_FOUND),
                        }
                    },
                ),
            )
    }

    pub(crate) fn transactions_body() -> Value {
        json!({"transactions": [
            {
                "account_balance": 13013,
                "amount": -849,
                "created": "2016-04-08T12:00:00+01:00",
                "currency": "GBP",
                "description": "HALFORDS 0371 MAIDENHEAD GB 0000",
                "id": "tx_1",
                "merchant": {"id": "merch_1", "name": "Halfords", "category": "shopping"},
                "metadata": {},
                "notes": "",
                "is_load": false,
                "settled": true,
                "category": "shopping"
            },
            {
                "account_balance": 13013,
                "amount": 0,
                "created": "2016-04-08T12:00:00+01:00",
                "currency": "GBP",
                "description": "PIN RESET",
                "id": "tx_pin",
                "metadata": {}
            },
            {
                "account_balance": 13013,
                "amount": -5000,
                "created": "2016-04-08T12:00:00+01:00",
                "currency": "GBP",
                "description": "DECLINED SHOP",
                "id": "tx_declined",
                "decline_reason": "INSUFFICIENT_FUNDS",
                "metadata": {}
            },
            {
                "account_balance": 12334,
                "amount": -1400,
                "created": "2016-04-08T12:00:00+01:00",
                "currency": "GBP",
                "description": "GIANS RESTAURANT MAIDENHEAD GB 0000",
                "id": "tx_2",
                "merchant": "merch_2",
                "metadata": {"notes": "dinner"},
                "settled": ""
            }
        ]})
    }

    /// Serve `router` on an ephemeral port and return its base URL
    pub(crate) async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    pub(crate) fn test_settings() -> Settings {
        Settings::new("client_id", "client_secret").unwrap()
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let base = spawn(mock_router()).await;
        let client = MonzoClient::with_base_url(test_settings(), base);

        let token = client.exchange_code("valid").await.unwrap();
        assert_eq!(token.access_token, "access_token");
        assert_eq!(token.user_id, "user_id");
        assert_eq!(token.expires_in, 21600);
        assert_eq!(token.refresh_token.as_deref(), Some("refresh_token"));
        assert_eq!(token.token_type, "Bearer");

        let err = client.exchange_code("invalid").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_wrong_secret_is_unauthorized() {
        let base = spawn(mock_router()).await;
        let settings = Settings::new("client_id", "wrong").unwrap();
        let client = MonzoClient::with_base_url(settings, base);

        let err = client.exchange_code("valid").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_accounts_and_transactions() {
        let base = spawn(mock_router()).await;
        let client = MonzoClient::with_base_url(test_settings(), format!("{}/", base));

        let token = client.exchange_code("valid").await.unwrap();
        let accounts = client.list_accounts(&token.access_token, &token.user_id).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, ACCOUNT_ID);
        assert_eq!(accounts[0].description, "Sam Martin");

        let transactions = client
            .list_transactions(&token.access_token, &accounts[0].id)
            .await
            .unwrap();
        assert_eq!(transactions.len(), 4);
        assert_eq!(transactions[0].currency, "GBP");
        assert_eq!(transactions[0].amount, -849);
        assert_eq!(transactions[2].decline_reason, "INSUFFICIENT_FUNDS");
        assert_eq!(transactions[3].extra["merchant"], "merch_2");
    }

    #[tokio::test]
    async fn test_bad_token_is_unauthorized() {
        let base = spawn(mock_router()).await;
        let client = MonzoClient::with_base_url(test_settings(), base);

        let err = client.list_accounts("expired", "user_id").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        let err = client.list_transactions("expired", ACCOUNT_ID).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_error_statuses_are_typed() {
        let router = Router::new()
            .route(
                "/accounts",
                get(|| async {
                    (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"code": "bad_request.missing_param", "message": "Missing account_id"})),
                    )
                }),
            )
            .route(
                "/transactions",
                get(|| async {
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        [("retry-after", "30")],
                        "slow down",
                    )
                }),
            )
            .route(
                "/oauth2/token",
                post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            );
        let base = spawn(router).await;
        let client = MonzoClient::with_base_url(test_settings(), base);

        match client.list_accounts("t", "u").await.unwrap_err() {
            ApiError::BadRequest(msg) => assert_eq!(msg, "Missing account_id"),
            other => panic!("unexpected error: {:?}", other),
        }
        match client.list_transactions("t", "a").await.unwrap_err() {
            ApiError::RateLimited { retry_after } => assert_eq!(retry_after, 30),
            other => panic!("unexpected error: {:?}", other),
        }
        match client.exchange_code("c").await.unwrap_err() {
            ApiError::ServerError(503, body) => assert_eq!(body, "maintenance"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_garbage_body_is_deserialization_error() {
        let router = Router::new().route("/accounts", get(|| async { "not json" }));
        let base = spawn(router).await;
        let client = MonzoClient::with_base_url(test_settings(), base);

        let err = client.list_accounts("t", "u").await.unwrap_err();
        assert!(matches!(err, ApiError::DeserializationError(_)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let client = MonzoClient::with_base_url(test_settings(), "http://127.0.0.1:1".to_string());
        let err = client.exchange_code("valid").await.unwrap_err();
        assert!(matches!(err, ApiError::RequestError(_)));
    }
}
