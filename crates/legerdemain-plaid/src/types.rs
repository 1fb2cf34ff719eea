//! Response bodies of the calls the client makes.
//!
//! Only the fields the tool reads are modelled; unknown fields are ignored.

use legerdemain_models::AccessToken;
use serde::{Deserialize, Serialize};

/// Response of `POST /item/public_token/exchange`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ExchangeResponse {
    /// Durable access token; redacted in `Debug` output.
    pub access_token: AccessToken,
    /// Item the token authorises.
    pub item_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// Response of `POST /accounts/get`.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AccountsResponse {
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// One account held at the institution.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Account {
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    pub balances: Balances,
}

/// Balances as reported by the institution.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct Balances {
    #[serde(default)]
    pub available: Option<f64>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
}
