//! # Legerdemain Link
//!
//! Interactive re-linking of an institution whose credential expired.
//!
//! When a remote call is classified as
//! [`RemoteError::ReauthRequired`](legerdemain_plaid::RemoteError), the
//! caller runs a [`LinkCoordinator`]:
//!
//! 1. A loopback [`LinkServer`] serves the consent page and static assets.
//! 2. The user's browser is pointed at it (best effort).
//! 3. The consent UI posts a short-lived token to the callback route, which
//!    exchanges it through the [`ExchangeGateway`](legerdemain_plaid::ExchangeGateway).
//! 4. The outcome comes back through a one-shot channel, the listener is
//!    stopped, and the new [`Credential`](legerdemain_models::Credential)
//!    is returned for the caller to persist.
//!
//! ```rust,no_run
//! use legerdemain_link::{LinkConfig, LinkCoordinator};
//! use legerdemain_models::LinkSettings;
//! use legerdemain_plaid::{Environment, ExchangeGateway, PlaidClient};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PlaidClient::new(Environment::Sandbox, "client-id", "secret")?;
//! let gateway = ExchangeGateway::new(client, "Chase");
//! let credential = LinkCoordinator::new(LinkConfig::default(), gateway)
//!     .link(LinkSettings::new("transactions", "sandbox", "pk_test"))
//!     .await?;
//! println!("new item {}", credential.item_id);
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod browser;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod server;
pub mod session;

pub use browser::{Launcher, ManualBrowser, SystemBrowser};
pub use config::LinkConfig;
pub use coordinator::{LinkCoordinator, LinkState};
pub use error::{CallbackError, LinkError};
pub use server::LinkServer;
pub use session::{LinkOutcome, LinkSession};
