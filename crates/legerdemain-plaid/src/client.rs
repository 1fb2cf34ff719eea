//! Authenticated HTTP client for the aggregation API.
//!
//! Every call is a JSON `POST` carrying `client_id` and `secret` next to the
//! call-specific fields. Non-2xx answers are decoded into
//! [`ApiErrorPayload`] when possible.

use std::time::Duration;

use legerdemain_models::{AccessToken, ApiErrorPayload, PlaidConfig, PublicToken};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::environment::Environment;
use crate::error::PlaidError;
use crate::types::{AccountsResponse, ExchangeResponse};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const EXCHANGE_PATH: &str = "/item/public_token/exchange";
const ACCOUNTS_PATH: &str = "/accounts/get";

/// Request body: credentials plus the call-specific fields.
#[derive(Serialize)]
struct AuthedRequest<'a, T: Serialize> {
    client_id: &'a str,
    secret: &'a str,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct ExchangeBody<'a> {
    public_token: &'a str,
}

#[derive(Serialize)]
struct AccessTokenBody<'a> {
    access_token: &'a str,
}

/// Client for one environment.
///
/// Clone is cheap: `reqwest::Client` shares its connection pool.
#[derive(Clone)]
pub struct PlaidClient {
    http: Client,
    base_url: String,
    client_id: String,
    secret: String,
}

impl std::fmt::Debug for PlaidClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaidClient")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl PlaidClient {
    /// Create a client for one of the hosted environments.
    pub fn new(environment: Environment, client_id: &str, secret: &str) -> Result<Self, PlaidError> {
        Self::with_base_url(environment.base_url(), client_id, secret)
    }

    /// Create a client against an arbitrary base URL (a local mock, a proxy).
    pub fn with_base_url(base_url: &str, client_id: &str, secret: &str) -> Result<Self, PlaidError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PlaidError::Config(format!("invalid base URL: {base_url}")));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            secret: secret.to_string(),
        })
    }

    /// Build a client from the configuration file.
    ///
    /// `environment` selects an entry by name; `None` picks the first one.
    /// An entry's `base_url` takes precedence over the hosted URL.
    pub fn from_config(config: &PlaidConfig, environment: Option<&str>) -> Result<Self, PlaidError> {
        let env = config.environment(environment)?;
        match &env.base_url {
            Some(url) => Self::with_base_url(url, &config.client_id, &env.secret),
            None => {
                let hosted: Environment = env
                    .name
                    .parse()
                    .map_err(|_| PlaidError::Config(format!("unknown environment: {}", env.name)))?;
                Self::new(hosted, &config.client_id, &env.secret)
            }
        }
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exchange a short-lived public token for an access token.
    pub async fn exchange_public_token(
        &self,
        public_token: &PublicToken,
    ) -> Result<ExchangeResponse, PlaidError> {
        self.post(
            EXCHANGE_PATH,
            ExchangeBody {
                public_token: public_token.as_str(),
            },
        )
        .await
    }

    /// Fetch the accounts of the item behind `access_token`.
    pub async fn get_accounts(
        &self,
        access_token: &AccessToken,
    ) -> Result<AccountsResponse, PlaidError> {
        self.post(
            ACCOUNTS_PATH,
            AccessTokenBody {
                access_token: access_token.expose(),
            },
        )
        .await
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: B,
    ) -> Result<R, PlaidError> {
        let url = format!("{}{path}", self.base_url);
        debug!(%url, "sending API request");

        let res = self
            .http
            .post(&url)
            .json(&AuthedRequest {
                client_id: &self.client_id,
                secret: &self.secret,
                body,
            })
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ApiErrorPayload>(&text) {
                Ok(payload) => PlaidError::Api {
                    status: status.as_u16(),
                    payload,
                },
                Err(_) => PlaidError::unexpected(status.as_u16(), &text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}
