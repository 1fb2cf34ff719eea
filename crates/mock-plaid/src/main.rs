//! Mock Plaid API for manual end-to-end runs of `legerdemain`.
//!
//! Implements just enough of the real API:
//!
//! * `POST /item/public_token/exchange` — any token starting with `public-`
//!   is exchanged for a fresh `access-mock-…` token.
//! * `POST /accounts/get` — returns two fixed accounts for a valid token,
//!   `ITEM_LOGIN_REQUIRED` for a token whose login was reset.
//! * `POST /sandbox/item/reset_login` — forces a token into the
//!   login-required state, like the real sandbox endpoint.
//!
//! Point an environment's `base_url` at `http://127.0.0.1:4010` to use it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use legerdemain_models::{ApiErrorPayload, ITEM_ERROR, ITEM_LOGIN_REQUIRED};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemStatus {
    Healthy,
    LoginRequired,
}

#[derive(Debug)]
struct Item {
    item_id: String,
    status: ItemStatus,
}

/// Access token → item.
#[derive(Default)]
struct MockState {
    items: Mutex<HashMap<String, Item>>,
}

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    client_id: String,
    #[serde(default)]
    secret: String,
}

#[derive(Deserialize)]
struct ExchangeRequest {
    #[serde(flatten)]
    credentials: Credentials,
    #[serde(default)]
    public_token: String,
}

#[derive(Deserialize)]
struct AccessTokenRequest {
    #[serde(flatten)]
    credentials: Credentials,
    #[serde(default)]
    access_token: String,
}

struct ApiError(ApiErrorPayload);

impl ApiError {
    fn new(error_type: &str, error_code: &str, message: &str) -> Self {
        let mut payload = ApiErrorPayload::new(error_type, error_code, message);
        payload.request_id = Some(Uuid::new_v4().to_string());
        Self(payload)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        info!(error_type = %self.0.error_type, error_code = %self.0.error_code, "returning API error");
        (StatusCode::BAD_REQUEST, Json(self.0)).into_response()
    }
}

fn check_keys(credentials: &Credentials) -> Result<(), ApiError> {
    if credentials.client_id.is_empty() || credentials.secret.is_empty() {
        return Err(ApiError::new(
            "INVALID_REQUEST",
            "INVALID_API_KEYS",
            "client_id and secret are required",
        ));
    }
    Ok(())
}

fn app(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/item/public_token/exchange", post(exchange))
        .route("/accounts/get", post(accounts))
        .route("/sandbox/item/reset_login", post(reset_login))
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("MOCK_PLAID_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4010);

    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    info!(address = %addr, "mock Plaid API listening");
    axum::serve(listener, app(Arc::new(MockState::default())))
        .await
        .expect("server error");
}

// --- Endpoints ---

async fn exchange(
    State(state): State<Arc<MockState>>,
    Json(req): Json<ExchangeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_keys(&req.credentials)?;
    if !req.public_token.starts_with("public-") {
        return Err(ApiError::new(
            "INVALID_INPUT",
            "INVALID_PUBLIC_TOKEN",
            "provided public token is in an invalid format",
        ));
    }

    let access_token = format!("access-mock-{}", Uuid::new_v4());
    let item_id = format!("item-{}", Uuid::new_v4().simple());
    state
        .items
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(
            access_token.clone(),
            Item {
                item_id: item_id.clone(),
                status: ItemStatus::Healthy,
            },
        );
    info!(%item_id, "public token exchanged");

    Ok(Json(json!({
        "access_token": access_token,
        "item_id": item_id,
        "request_id": Uuid::new_v4().to_string(),
    })))
}

async fn accounts(
    State(state): State<Arc<MockState>>,
    Json(req): Json<AccessTokenRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_keys(&req.credentials)?;
    let items = state.items.lock().unwrap_or_else(PoisonError::into_inner);
    let item = items.get(&req.access_token).ok_or_else(|| {
        ApiError::new(
            "INVALID_INPUT",
            "INVALID_ACCESS_TOKEN",
            "provided access token is in an invalid format",
        )
    })?;

    if item.status == ItemStatus::LoginRequired {
        return Err(ApiError::new(
            ITEM_ERROR,
            ITEM_LOGIN_REQUIRED,
            "the login details of this item have changed",
        ));
    }

    Ok(Json(json!({
        "accounts": [
            {
                "account_id": format!("{}-chk", item.item_id),
                "name": "Mock Checking",
                "official_name": "Mock Gold Standard 0% Interest Checking",
                "type": "depository",
                "subtype": "checking",
                "mask": "0000",
                "balances": { "available": 100.0, "current": 110.0, "iso_currency_code": "USD" }
            },
            {
                "account_id": format!("{}-cc", item.item_id),
                "name": "Mock Credit Card",
                "type": "credit",
                "subtype": "credit card",
                "mask": "3333",
                "balances": { "available": null, "current": 410.0, "iso_currency_code": "USD" }
            }
        ],
        "request_id": Uuid::new_v4().to_string(),
    })))
}

async fn reset_login(
    State(state): State<Arc<MockState>>,
    Json(req): Json<AccessTokenRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    check_keys(&req.credentials)?;
    let mut items = state.items.lock().unwrap_or_else(PoisonError::into_inner);
    let item = items.get_mut(&req.access_token).ok_or_else(|| {
        ApiError::new(
            "INVALID_INPUT",
            "INVALID_ACCESS_TOKEN",
            "provided access token is in an invalid format",
        )
    })?;
    item.status = ItemStatus::LoginRequired;
    info!(item_id = %item.item_id, "login reset");

    Ok(Json(json!({ "reset_login": true, "request_id": Uuid::new_v4().to_string() })))
}
