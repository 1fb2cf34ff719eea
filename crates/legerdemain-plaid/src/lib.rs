//! # Legerdemain Plaid
//!
//! Thin client for the two aggregation-API calls the tool depends on, plus
//! the logic that decides what a failed call means.
//!
//! * [`PlaidClient`] — authenticated JSON-over-HTTP client.
//! * [`ExchangeGateway`] — turns a short-lived public token into a durable
//!   [`Credential`](legerdemain_models::Credential).
//! * [`classify`] / [`RemoteError`] — separates "the user must re-link"
//!   from every other failure.
//! * [`PlaidError`] — unified error type for transport and API failures.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use legerdemain_models::{AccessToken, ItemId};
//! use legerdemain_plaid::{classify, Environment, PlaidClient, ReauthContext, RemoteError};
//!
//! # async fn run() -> Result<(), legerdemain_plaid::PlaidError> {
//! let client = PlaidClient::new(Environment::Sandbox, "client-id", "secret")?;
//! match client.get_accounts(&AccessToken::new("access-sandbox-1")).await {
//!     Ok(accounts) => println!("{} accounts", accounts.accounts.len()),
//!     Err(e) => match classify(e, ReauthContext::new("Chase", ItemId::new("item_1"))) {
//!         RemoteError::ReauthRequired(ctx) => println!("re-link {}", ctx.institution),
//!         RemoteError::Other(e) => return Err(e),
//!     },
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod environment;
pub mod error;
pub mod exchange;
pub mod types;

pub use classify::{classify, requires_reauth, ReauthContext, RemoteError};
pub use client::PlaidClient;
pub use environment::Environment;
pub use error::PlaidError;
pub use exchange::{ExchangeError, ExchangeGateway};
pub use types::{Account, AccountsResponse, Balances, ExchangeResponse};
