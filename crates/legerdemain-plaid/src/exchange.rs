//! Public-token exchange.
//!
//! One consent attempt maps to one exchange attempt: the gateway never
//! retries. Retrying means running the interactive flow again.

use legerdemain_models::{Credential, ItemId, ModelError, PublicToken};
use tracing::info;

use crate::client::PlaidClient;
use crate::error::PlaidError;

/// Why an exchange did not yield a credential.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// The callback delivered an empty token; nothing was sent.
    #[error("invalid public token: {0}")]
    InvalidToken(#[from] ModelError),

    /// The remote exchange call failed.
    #[error("token exchange failed: {0}")]
    Remote(#[from] PlaidError),
}

/// Exchanges public tokens for credentials of one institution.
#[derive(Debug, Clone)]
pub struct ExchangeGateway {
    client: PlaidClient,
    institution: String,
}

impl ExchangeGateway {
    /// Create a gateway issuing credentials for `institution`.
    pub fn new(client: PlaidClient, institution: &str) -> Self {
        Self {
            client,
            institution: institution.to_string(),
        }
    }

    /// Institution the issued credentials belong to.
    pub fn institution(&self) -> &str {
        &self.institution
    }

    /// Exchange `public_token` for a durable credential.
    ///
    /// Makes exactly one outbound call, or none when the token is empty.
    pub async fn exchange(&self, public_token: &str) -> Result<Credential, ExchangeError> {
        let token = PublicToken::parse(public_token)?;
        let res = self.client.exchange_public_token(&token).await?;

        if res.access_token.is_empty() {
            return Err(PlaidError::unexpected(200, "exchange response has an empty access_token").into());
        }

        info!(
            institution = %self.institution,
            item_id = %res.item_id,
            "public token exchanged"
        );

        Ok(Credential::issue(
            &self.institution,
            ItemId::from(res.item_id),
            res.access_token,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    /// Mock exchange endpoint that counts calls and fails for `tok_bad`.
    async fn spawn_exchange_mock(calls: Arc<AtomicUsize>) -> String {
        let app = Router::new().route(
            "/item/public_token/exchange",
            post(move |Json(body): Json<Value>| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if body["public_token"] == "tok_bad" {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({
                                "error_type": "INVALID_INPUT",
                                "error_code": "INVALID_PUBLIC_TOKEN",
                                "error_message": "provided public token is expired"
                            })),
                        )
                            .into_response();
                    }
                    Json(json!({ "access_token": "acc_123", "item_id": "item_1" })).into_response()
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn gateway(base: &str) -> ExchangeGateway {
        ExchangeGateway::new(
            PlaidClient::with_base_url(base, "id", "secret").unwrap(),
            "Chase",
        )
    }

    #[tokio::test]
    async fn success_issues_credential_with_one_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let base = spawn_exchange_mock(calls.clone()).await;

        let cred = gateway(&base).exchange("tok_abc").await.unwrap();
        assert_eq!(cred.institution, "Chase");
        assert_eq!(cred.access_token.expose(), "acc_123");
        assert_eq!(cred.item_id.as_str(), "item_1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_is_wrapped_without_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let base = spawn_exchange_mock(calls.clone()).await;

        let err = gateway(&base).exchange("tok_bad").await.unwrap_err();
        let ExchangeError::Remote(PlaidError::Api { payload, .. }) = err else {
            panic!("expected remote API failure, got {err:?}");
        };
        assert_eq!(payload.error_code, "INVALID_PUBLIC_TOKEN");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_token_makes_no_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let base = spawn_exchange_mock(calls.clone()).await;

        let err = gateway(&base).exchange("").await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidToken(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
